//! Exclusion pattern lists from the `[exclude]` config section

use fsguard_core::platform::CURRENT_PLATFORM;
use serde::{Deserialize, Serialize};

/// Exclusion patterns, global and per platform
///
/// Example:
/// ```toml
/// [exclude]
/// global = [".git/", "*.log", "target/"]
/// darwin = [".DS_Store"]
/// windows = ["Thumbs.db"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludesConfig {
    /// Patterns applied on every platform
    #[serde(default)]
    pub global: Vec<String>,
    /// macOS-only patterns
    #[serde(default)]
    pub darwin: Vec<String>,
    /// Linux-only patterns
    #[serde(default)]
    pub linux: Vec<String>,
    /// Windows-only patterns
    #[serde(default)]
    pub windows: Vec<String>,
}

impl ExcludesConfig {
    /// Global patterns followed by the section for `os`
    ///
    /// Unknown platform names only get the global list.
    pub fn patterns_for(&self, os: &str) -> Vec<String> {
        let platform: &[String] = match os {
            "darwin" => &self.darwin,
            "linux" => &self.linux,
            "windows" => &self.windows,
            _ => &[],
        };

        self.global.iter().chain(platform).cloned().collect()
    }

    /// Patterns for the platform this binary runs on
    pub fn patterns_for_platform(&self) -> Vec<String> {
        self.patterns_for(CURRENT_PLATFORM.os)
    }

    /// Whether every section is empty
    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
            && self.darwin.is_empty()
            && self.linux.is_empty()
            && self.windows.is_empty()
    }
}
