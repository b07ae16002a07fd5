//! Configuration management
//!
//! Loads the optional `.fsguard.toml` file. The configuration is plain data:
//! it is turned into traversal options and exclusion lists by the caller, the
//! file-operation core never reads configuration on its own.

use crate::excludes::ExcludesConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Name of the configuration file looked up in a directory
pub const CONFIG_FILE_NAME: &str = ".fsguard.toml";

/// Traversal policy section (`[walk]`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkConfig {
    /// Resolve symbolic links and descend into linked directories
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Deepest level to visit (0 = direct children of the root only)
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Skip entries whose name starts with `.`
    #[serde(default)]
    pub ignore_hidden: bool,

    /// Silently skip entries that cannot be read
    #[serde(default)]
    pub ignore_permission_errors: bool,
}

/// Main configuration structure
///
/// Example:
/// ```toml
/// [walk]
/// followSymlinks = false
/// maxDepth = 8
/// ignoreHidden = false
/// ignorePermissionErrors = true
///
/// [exclude]
/// global = [".git/", "*.log"]
/// darwin = [".DS_Store"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Traversal policy
    #[serde(default)]
    pub walk: WalkConfig,

    /// Exclusion patterns
    #[serde(default)]
    pub exclude: ExcludesConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: format!("failed to read: {e}"),
        })?;

        Self::from_toml_str(&content, path)
    }

    /// Load `.fsguard.toml` from a directory
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load(&dir.join(CONFIG_FILE_NAME))
    }

    /// Parse configuration text
    ///
    /// `origin` is only used for error messages.
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            path: origin.to_path_buf(),
            message: format!("failed to parse: {e}"),
        })
    }

    /// Exclusion patterns for the running platform
    pub fn exclude_patterns(&self) -> Vec<String> {
        self.exclude.patterns_for_platform()
    }
}
