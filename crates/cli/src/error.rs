//! Error types for CLI commands
//!
//! Structured errors via thiserror for the failures a command reports on its
//! own; everything coming from the library crates is wrapped as-is.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during command execution
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CommandError {
    /// Directory and archive differ
    #[error("{} does not match archive {} ({count} difference(s))", dir.display(), archive.display())]
    VerificationFailed {
        /// Directory that was verified
        dir: PathBuf,
        /// Archive it was verified against
        archive: PathBuf,
        /// Number of differing entries
        count: usize,
    },

    /// `--mode` value is not an octal permission
    #[error("Invalid file mode {0:?}: expected octal digits such as 644 or 0755")]
    InvalidMode(String),

    /// Error from the fsguard library crates
    #[error(transparent)]
    Fsguard(#[from] fsguard_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error with context
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use std::io;

    #[test]
    fn test_verification_failed_message() {
        let error = CommandError::VerificationFailed {
            dir: PathBuf::from("site"),
            archive: PathBuf::from("site.zip"),
            count: 3,
        };

        let error_msg = error.to_string();
        assert!(error_msg.contains("site does not match archive site.zip"));
        assert!(error_msg.contains('3'));
    }

    #[test]
    fn test_invalid_mode_message() {
        let error = CommandError::InvalidMode("rwx".to_string());
        assert!(error.to_string().contains("\"rwx\""));
    }

    #[test]
    fn test_core_error_conversion() {
        let core_error = fsguard_core::Error::InvalidPath {
            path: "../x".to_string(),
            reason: "contains parent directory reference",
        };
        let error: CommandError = core_error.into();

        assert!(matches!(error, CommandError::Fsguard(_)));
        assert!(error.to_string().contains("../x"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed");
        let error: CommandError = io_error.into();

        assert!(error.to_string().contains("IO error"));
    }

    #[test]
    fn test_anyhow_error_conversion() {
        let error: CommandError = anyhow::anyhow!("something went wrong").into();
        assert!(error.to_string().contains("something went wrong"));
    }
}
