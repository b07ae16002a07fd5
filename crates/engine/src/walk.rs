//! Directory traversal with exclusion, depth, symlink and hidden-file policy
//!
//! [`walk`] visits every entry below a root depth-first and pre-order: a
//! directory is reported before its children, and the entries of one
//! directory are visited in file-name order. Depth 0 is the root's direct
//! children; the root itself is never reported.
//!
//! Excluded and hidden entries (see [`TraversalOptions`]) are not reported and
//! excluded directories are pruned, so nothing below them is visited either.

use crate::{Error, Result};
use fsguard_config::{Config, PatternMatcher};
use fsguard_core::{NoFilter, PathFilter};
use fsguard_core::path::{is_hidden_name, relative_slash};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::{DirEntry, WalkDir};

/// What the visitor wants the walk to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkSignal {
    /// Keep going (descend into the entry if it is a directory)
    Continue,
    /// Do not descend into this directory; no effect on files
    SkipSubtree,
}

/// Policy for a single walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalOptions {
    /// Exclusion patterns, matched against the path relative to the root
    pub exclude_patterns: Vec<String>,
    /// Resolve symlinks and descend into linked directories
    pub follow_symlinks: bool,
    /// Deepest level to visit; `None` is unlimited, `Some(0)` only the root's children
    pub max_depth: Option<usize>,
    /// Skip entries whose name starts with `.` (the root itself is exempt)
    pub ignore_hidden: bool,
    /// Silently skip entries that cannot be read because of permissions
    pub ignore_permission_errors: bool,
}

impl TraversalOptions {
    /// Options with only exclusion patterns set
    pub fn excluding<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude_patterns: patterns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Build options from the `[walk]` and `[exclude]` configuration sections
    pub fn from_config(config: &Config) -> Self {
        Self {
            exclude_patterns: config.exclude_patterns(),
            follow_symlinks: config.walk.follow_symlinks,
            max_depth: config.walk.max_depth,
            ignore_hidden: config.walk.ignore_hidden,
            ignore_permission_errors: config.walk.ignore_permission_errors,
        }
    }
}

/// Walk `root`, applying the exclusion patterns from `options`
///
/// The visitor receives the entry path, its metadata (link metadata for
/// unfollowed symlinks) and no error for every visited entry. When an entry or
/// directory cannot be read it receives the failing path, no metadata and the
/// error instead. Returning `Ok` from the visitor continues the walk (for
/// errors too); returning `Err` aborts it with that error.
///
/// Permission errors never reach the visitor when
/// `options.ignore_permission_errors` is set.
///
/// # Examples
///
/// ```no_run
/// use fsguard_engine::walk::{TraversalOptions, WalkSignal, walk};
/// use std::path::Path;
///
/// # fn main() -> fsguard_engine::Result<()> {
/// let options = TraversalOptions::excluding([".git/", "target/"]);
/// walk(Path::new("."), &options, |path, _metadata, error| {
///     if let Some(error) = error {
///         return Err(error);
///     }
///     println!("{}", path.display());
///     Ok(WalkSignal::Continue)
/// })?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if the root cannot be read or the visitor aborts.
pub fn walk<F>(root: &Path, options: &TraversalOptions, visitor: F) -> Result<()>
where
    F: FnMut(&Path, Option<&Metadata>, Option<Error>) -> Result<WalkSignal>,
{
    let matcher = PatternMatcher::new(&options.exclude_patterns);
    walk_filtered(root, options, &matcher, visitor)
}

/// Walk `root` with a caller-supplied exclusion filter
///
/// Identical to [`walk`] except that `filter` decides exclusion and
/// `options.exclude_patterns` is ignored.
pub fn walk_filtered<F>(
    root: &Path,
    options: &TraversalOptions,
    filter: &dyn PathFilter,
    mut visitor: F,
) -> Result<()>
where
    F: FnMut(&Path, Option<&Metadata>, Option<Error>) -> Result<WalkSignal>,
{
    fs::metadata(root).map_err(|e| Error::from_io("walk", root, e))?;

    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name();
    if let Some(depth) = options.max_depth {
        walker = walker.max_depth(depth + 1);
    }

    let mut entries = walker
        .into_iter()
        .filter_entry(|entry| !is_pruned(root, entry, options, filter));

    while let Some(item) = entries.next() {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                let (path, error) = convert_walk_error(root, err);
                report_error(&path, error, options, &mut visitor)?;
                continue;
            }
        };

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                let (path, error) = convert_walk_error(root, err);
                report_error(&path, error, options, &mut visitor)?;
                if entry.file_type().is_dir() {
                    entries.skip_current_dir();
                }
                continue;
            }
        };

        trace!(path = %entry.path().display(), depth = entry.depth() - 1, "Visiting entry");
        let signal = visitor(entry.path(), Some(&metadata), None)?;

        if signal == WalkSignal::SkipSubtree && entry.file_type().is_dir() {
            trace!(path = %entry.path().display(), "Skipping subtree");
            entries.skip_current_dir();
        }
    }

    Ok(())
}

/// Collect the non-directory entries below `root`
///
/// Permission errors are always tolerated. With `recursive = false` only the
/// root's direct children are considered.
///
/// # Errors
///
/// Returns an error if the root cannot be read or an entry fails for a reason
/// other than permissions.
pub fn list_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let options = TraversalOptions {
        max_depth: if recursive { None } else { Some(0) },
        ignore_permission_errors: true,
        ..TraversalOptions::default()
    };

    let mut files = Vec::new();
    walk_filtered(root, &options, &NoFilter, |path, metadata, error| {
        if let Some(error) = error {
            return Err(error);
        }
        if metadata.is_some_and(|m| !m.is_dir()) {
            files.push(path.to_path_buf());
        }
        Ok(WalkSignal::Continue)
    })?;

    Ok(files)
}

/// Whether an entry is excluded or hidden (and pruned if it is a directory)
fn is_pruned(
    root: &Path,
    entry: &DirEntry,
    options: &TraversalOptions,
    filter: &dyn PathFilter,
) -> bool {
    if entry.depth() == 0 {
        return false;
    }

    if options.ignore_hidden && is_hidden_name(entry.file_name()) {
        trace!(path = %entry.path().display(), "Skipping hidden entry");
        return true;
    }

    match relative_slash(entry.path(), root) {
        Ok(rel) if filter.should_exclude(&rel) => {
            trace!(path = %rel, "Skipping excluded entry");
            true
        }
        _ => false,
    }
}

fn report_error<F>(
    path: &Path,
    error: Error,
    options: &TraversalOptions,
    visitor: &mut F,
) -> Result<()>
where
    F: FnMut(&Path, Option<&Metadata>, Option<Error>) -> Result<WalkSignal>,
{
    if options.ignore_permission_errors && error.is_permission_denied() {
        trace!(path = %path.display(), "Ignoring permission error");
        return Ok(());
    }

    visitor(path, None, Some(error)).map(|_| ())
}

fn convert_walk_error(root: &Path, err: walkdir::Error) -> (PathBuf, Error) {
    let path = err
        .path()
        .map_or_else(|| root.to_path_buf(), Path::to_path_buf);

    if let Some(ancestor) = err.loop_ancestor() {
        let source = io::Error::other(format!(
            "symlink loop back to {}",
            ancestor.display()
        ));
        return (
            path.clone(),
            Error::Io {
                op: "walk",
                path,
                source,
            },
        );
    }

    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("unknown traversal error"));
    (path.clone(), Error::from_io("walk", path, source))
}
