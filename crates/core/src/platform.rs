//! Platform detection for platform-specific exclusion lists
//!
//! Configuration files may carry `darwin`, `linux` and `windows` exclusion
//! sections; this module names the one that applies to the running binary.
//! macOS is reported by its kernel name, `"darwin"`.

use std::sync::LazyLock;

/// Current platform information (cached)
///
/// # Example
/// ```
/// use fsguard_core::platform::CURRENT_PLATFORM;
///
/// assert!(["darwin", "linux", "windows", "unknown"].contains(&CURRENT_PLATFORM.os));
/// ```
pub static CURRENT_PLATFORM: LazyLock<Platform> = LazyLock::new(Platform::detect);

/// Platform information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// OS: "darwin", "linux", "windows" or "unknown"
    pub os: &'static str,
    /// CPU architecture: "x86_64", "aarch64", etc.
    pub arch: &'static str,
}

impl Platform {
    /// Detect the platform this binary was compiled for
    pub fn detect() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            "linux" => "linux",
            "windows" => "windows",
            _ => "unknown",
        };

        Self {
            os,
            arch: std::env::consts::ARCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_matches_cached_value() {
        assert_eq!(*CURRENT_PLATFORM, Platform::detect());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_name() {
        assert_eq!(CURRENT_PLATFORM.os, "linux");
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_macos_reports_darwin() {
        assert_eq!(CURRENT_PLATFORM.os, "darwin");
    }
}
