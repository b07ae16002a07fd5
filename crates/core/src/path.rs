//! Forward-slash relative path helpers
//!
//! Exclusion patterns and snapshot records address entries by a relative path
//! that always uses `/` as the separator, regardless of platform. This module
//! provides the conversions between `std::path` values and that form.
//!
//! # Examples
//!
//! ```
//! use fsguard_core::path::{relative_slash, segment_count};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rel = relative_slash(Path::new("/data/project/src/main.rs"), Path::new("/data/project"))?;
//! assert_eq!(rel, "src/main.rs");
//! assert_eq!(segment_count(&rel), 2);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::{Component, Path};
use std::sync::Arc;

/// Render a path with forward slashes
///
/// Components are joined with `/`; root and prefix components are dropped so
/// the result is always suitable for relative matching.
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        let part = match component {
            Component::Normal(part) => part.to_string_lossy(),
            Component::CurDir => continue,
            Component::ParentDir => "..".into(),
            Component::RootDir | Component::Prefix(_) => continue,
        };
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&part);
    }
    out
}

/// Normalize a string path to forward slashes
///
/// Backslashes are converted and a leading `./` is removed.
pub fn normalize_slashes(path: &str) -> String {
    let converted = path.replace('\\', "/");
    match converted.strip_prefix("./") {
        Some(stripped) => stripped.to_string(),
        None => converted,
    }
}

/// Relative forward-slash path of `path` under `base`
///
/// # Errors
///
/// Returns [`Error::InvalidPathPrefix`] if `path` is not under `base`.
pub fn relative_slash(path: &Path, base: &Path) -> Result<String> {
    path.strip_prefix(base)
        .map(to_slash)
        .map_err(|_| Error::InvalidPathPrefix {
            path: Arc::new(path.to_path_buf()),
            base: Arc::new(base.to_path_buf()),
        })
}

/// Number of `/`-separated segments in a relative path
///
/// Empty segments (from doubled or trailing slashes) are not counted.
pub fn segment_count(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

/// Whether a file name marks a hidden entry (leading `.`)
pub fn is_hidden_name(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}
