//! Base error types for fsguard
//!
//! Every crate in the workspace shares this taxonomy. Variants carry the
//! operation name, the path involved and the underlying cause so callers can
//! attribute a failure without parsing strings.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error used for causes that come from outside this crate
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Base error type for shared functionality
#[derive(Error, Debug)]
pub enum Error {
    /// Path failed the safety or format checks
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Path does not exist
    #[error("{op}: {} not found", path.display())]
    NotFound {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Access was refused by the operating system
    #[error("{op}: permission denied for {}", path.display())]
    PermissionDenied {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Destination already exists and could not be replaced
    #[error("{op}: {} already exists", path.display())]
    AlreadyExists {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure (disk full, device error, cross-device rename)
    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Zip container could not be read
    #[error("Malformed archive {}: {source}", path.display())]
    MalformedArchive {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// A resource's cleanup panicked
    #[error("Panic during cleanup of {resource}: {message}")]
    PanicDuringCleanup { resource: String, message: String },

    /// A resource's cleanup returned an error
    #[error("Cleanup failed for {resource}: {source}")]
    Cleanup {
        resource: String,
        #[source]
        source: BoxError,
    },

    /// Operation was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// An atomic writer was used outside the state that allows the call
    #[error("Cannot {op} an atomic writer that is {state}")]
    InvalidState {
        op: &'static str,
        state: &'static str,
    },

    /// Several independent failures, in the order they happened
    #[error("{} errors occurred:\n{}", .0.len(), format_errors(.0))]
    Aggregate(Vec<Error>),

    /// Configuration file could not be loaded
    #[error("Configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// Path is outside the base it was expected under
    #[error("Path {} is not under base directory {}", path.display(), base.display())]
    InvalidPathPrefix {
        path: Arc<PathBuf>,
        base: Arc<PathBuf>,
    },

    /// Generic error message
    #[error("{0}")]
    Message(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

fn format_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!("  {}. {e}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    /// Classify an I/O error by its kind
    ///
    /// `op` names the operation that failed (e.g. `"rename"`), `path` the file
    /// it was applied to.
    pub fn from_io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Error::NotFound { op, path, source },
            io::ErrorKind::PermissionDenied => Error::PermissionDenied { op, path, source },
            io::ErrorKind::AlreadyExists => Error::AlreadyExists { op, path, source },
            _ => Error::Io { op, path, source },
        }
    }

    /// Fold a list of failures into one error
    ///
    /// Returns `None` for an empty list, the error itself for a single one,
    /// and [`Error::Aggregate`] otherwise. Nested aggregates are flattened.
    pub fn combine(errors: Vec<Error>) -> Option<Self> {
        let mut flat = Vec::with_capacity(errors.len());
        for error in errors {
            match error {
                Error::Aggregate(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Error::Aggregate(flat)),
        }
    }

    /// Whether this error (or any aggregated error) is a permission failure
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Error::PermissionDenied { .. } => true,
            Error::Aggregate(errors) => errors.iter().any(Error::is_permission_denied),
            _ => false,
        }
    }

    /// Whether this error (or any aggregated error) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Aggregate(errors) => errors.iter().any(Error::is_cancelled),
            _ => false,
        }
    }

    /// Whether this error (or any aggregated error) came from a panicking cleanup
    pub fn is_panic(&self) -> bool {
        match self {
            Error::PanicDuringCleanup { .. } => true,
            Error::Aggregate(errors) => errors.iter().any(Error::is_panic),
            _ => false,
        }
    }
}
