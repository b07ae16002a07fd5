//! Path safety and accessibility checks
//!
//! The checks compose: [`validate_existence`] runs [`validate_path`] first,
//! [`validate_readable`] requires existence, and [`validate_writable`] walks up
//! to the nearest existing ancestor when the target does not exist yet.
//!
//! Readability and writability are verified with real, reversible probes
//! (opening the file, listing the directory, creating and removing a marker)
//! because effective permissions can differ from the nominal mode bits under
//! ACLs or read-only mounts.

use crate::error::{Error, Result};
use std::fs::{self, Metadata, OpenOptions};
use std::path::Path;
use tracing::trace;

/// Substrings that are never accepted in a path
const FORBIDDEN: &[(&str, &str)] = &[
    ("..", "path traversal sequence"),
    ("~", "home directory expansion"),
    ("$", "variable expansion"),
    ("\0", "NUL byte"),
    ("\r", "carriage return"),
    ("\n", "line feed"),
];

/// Check that a path is syntactically safe
///
/// Rejects empty paths and any path containing `..`, `~`, `$`, NUL, CR or LF.
/// Does not touch the filesystem.
///
/// # Examples
///
/// ```
/// use fsguard_core::validate::validate_path;
/// use std::path::Path;
///
/// assert!(validate_path(Path::new("/srv/app/config.toml")).is_ok());
/// assert!(validate_path(Path::new("../etc/passwd")).is_err());
/// assert!(validate_path(Path::new("")).is_err());
/// ```
pub fn validate_path(path: &Path) -> Result<()> {
    let text = path.to_string_lossy();

    if text.is_empty() {
        return Err(Error::InvalidPath {
            path: String::new(),
            reason: "path is empty",
        });
    }

    for &(needle, reason) in FORBIDDEN {
        if text.contains(needle) {
            return Err(Error::InvalidPath {
                path: text.into_owned(),
                reason,
            });
        }
    }

    Ok(())
}

/// Check that a path is safe and exists
///
/// Returns the path's metadata. A missing path yields [`Error::NotFound`];
/// any other stat failure (including permission problems on a parent) is
/// reported with its own classification.
pub fn validate_existence(path: &Path) -> Result<Metadata> {
    validate_path(path)?;
    fs::metadata(path).map_err(|e| Error::from_io("stat", path, e))
}

/// Check that a path exists and can be read
///
/// Files are opened for reading; directories are listed.
pub fn validate_readable(path: &Path) -> Result<()> {
    let metadata = validate_existence(path)?;

    if metadata.is_dir() {
        fs::read_dir(path).map_err(|e| Error::from_io("read directory", path, e))?;
    } else {
        OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| Error::from_io("open for reading", path, e))?;
    }

    Ok(())
}

/// Check that a path can be written
///
/// - Existing directory: a marker file is created inside it and removed again.
/// - Existing file: opened for writing (without truncation) and closed.
/// - Missing path: the nearest existing ancestor must be a writable directory.
pub fn validate_writable(path: &Path) -> Result<()> {
    validate_path(path)?;

    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => probe_directory(path),
        Ok(_) => {
            OpenOptions::new()
                .write(true)
                .open(path)
                .map_err(|e| Error::from_io("open for writing", path, e))?;
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let parent = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            trace!(path = %path.display(), parent = %parent.display(), "Target missing, checking ancestor");
            validate_writable_ancestor(parent)
        }
        Err(e) => Err(Error::from_io("stat", path, e)),
    }
}

fn validate_writable_ancestor(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => probe_directory(path),
        Ok(_) => Err(Error::InvalidPath {
            path: path.to_string_lossy().into_owned(),
            reason: "ancestor is not a directory",
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => validate_writable_ancestor(parent),
            _ => validate_writable_ancestor(Path::new(".")),
        },
        Err(e) => Err(Error::from_io("stat", path, e)),
    }
}

/// Create and immediately delete a marker file inside `dir`
fn probe_directory(dir: &Path) -> Result<()> {
    let marker = tempfile::Builder::new()
        .prefix(".fsguard-probe-")
        .tempfile_in(dir)
        .map_err(|e| Error::from_io("create write probe", dir, e))?;
    marker
        .close()
        .map_err(|e| Error::from_io("remove write probe", dir, e))
}
