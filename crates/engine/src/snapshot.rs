//! Directory and archive snapshots
//!
//! A [`DirectorySnapshot`] is a sorted list of [`FileRecord`]s describing a
//! tree at one point in time. Snapshots of a live directory and of a zip
//! archive use the same record format and the same content hash, so the two
//! can be compared with [`compare`].
//!
//! Equality is about content: modification times are recorded but never
//! compared.

use crate::hash::{hash_file, hash_reader};
use crate::walk::{TraversalOptions, WalkSignal, walk};
use crate::{BoxError, Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use fsguard_core::path::relative_slash;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// One entry of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Forward-slash path relative to the snapshot root (or the stored
    /// archive entry name)
    pub relative_path: String,
    /// Content length in bytes; 0 for directories
    pub size: u64,
    /// Modification time truncated to whole seconds
    #[serde(serialize_with = "serialize_time")]
    pub modified_time: SystemTime,
    /// Directory entry rather than a file
    pub is_directory: bool,
    /// Hex SHA-256 of the content, for regular files only
    pub content_hash: Option<String>,
}

fn serialize_time<S: Serializer>(
    time: &SystemTime,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&DateTime::<Utc>::from(*time).to_rfc3339())
}

impl FileRecord {
    /// Whether two records describe the same entry with the same content
    pub fn same_content(&self, other: &FileRecord) -> bool {
        self.relative_path == other.relative_path
            && self.size == other.size
            && self.is_directory == other.is_directory
            && (self.is_directory || self.content_hash == other.content_hash)
    }
}

/// Immutable, sorted set of records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DirectorySnapshot {
    records: Vec<FileRecord>,
}

impl DirectorySnapshot {
    /// Build a snapshot, sorting records by relative path
    pub fn new(mut records: Vec<FileRecord>) -> Self {
        records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Self { records }
    }

    /// Records in path order
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Iterate records in path order
    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for a relative path
    pub fn get(&self, relative_path: &str) -> Option<&FileRecord> {
        self.records
            .binary_search_by(|r| r.relative_path.as_str().cmp(relative_path))
            .ok()
            .map(|index| &self.records[index])
    }

    /// The same snapshot without directory records
    #[must_use]
    pub fn files_only(&self) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| !r.is_directory)
                .cloned()
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DirectorySnapshot {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Snapshot a directory tree
///
/// Excluded subtrees are pruned. Symlinks are recorded, not followed, and get
/// no hash. Every regular file is hashed over its full content.
///
/// # Errors
///
/// Any traversal, stat or read error aborts the snapshot.
pub fn snapshot_directory<S: AsRef<str>>(root: &Path, exclude_patterns: &[S]) -> Result<DirectorySnapshot> {
    let options = TraversalOptions::excluding(exclude_patterns.iter().map(|p| p.as_ref().to_string()));
    let mut records = Vec::new();

    walk(root, &options, |path, metadata, error| {
        if let Some(error) = error {
            return Err(error);
        }
        let Some(metadata) = metadata else {
            return Ok(WalkSignal::Continue);
        };

        let is_directory = metadata.is_dir();
        let modified = metadata
            .modified()
            .map_err(|e| Error::from_io("stat", path, e))?;
        let content_hash = if metadata.is_file() {
            Some(hash_file(path).map_err(|e| Error::from_io("hash", path, e))?)
        } else {
            None
        };

        records.push(FileRecord {
            relative_path: relative_slash(path, root)?,
            size: if is_directory { 0 } else { metadata.len() },
            modified_time: truncate_to_seconds(modified),
            is_directory,
            content_hash,
        });
        Ok(WalkSignal::Continue)
    })?;

    debug!(root = %root.display(), records = records.len(), "Snapshot of directory taken");
    Ok(DirectorySnapshot::new(records))
}

/// Snapshot the file entries of a zip archive
///
/// Directory entries are skipped. Each entry's decompressed content is hashed
/// and its stored name is used as the relative path.
///
/// # Errors
///
/// The classified I/O error if the archive cannot be opened, otherwise
/// [`Error::MalformedArchive`] for anything wrong with its content.
pub fn snapshot_archive(archive_path: &Path) -> Result<DirectorySnapshot> {
    let malformed = |source: BoxError| Error::MalformedArchive {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(|e| Error::from_io("open archive", archive_path, e))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| malformed(Box::new(e)))?;

    let mut records = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| malformed(Box::new(e)))?;
        if entry.is_dir() {
            continue;
        }

        let stamp: Option<zip::DateTime> = entry.last_modified().into();
        let relative_path = entry.name().to_string();
        let size = entry.size();
        let content_hash = hash_reader(&mut entry).map_err(|e| malformed(Box::new(e)))?;

        records.push(FileRecord {
            relative_path,
            size,
            modified_time: stamp.map_or(UNIX_EPOCH, zip_time_to_system),
            is_directory: false,
            content_hash: Some(content_hash),
        });
    }

    debug!(archive = %archive_path.display(), records = records.len(), "Snapshot of archive taken");
    Ok(DirectorySnapshot::new(records))
}

/// Whether two snapshots have the same entries with the same content
///
/// Records are compared pairwise on path, size, kind and (for files) hash.
/// Modification time is ignored.
pub fn compare(a: &DirectorySnapshot, b: &DirectorySnapshot) -> bool {
    a.len() == b.len()
        && a
            .records
            .iter()
            .zip(&b.records)
            .all(|(x, y)| x.same_content(y))
}

/// Whether a directory holds exactly the files of an archive
///
/// Zip archives have no implicit directory entries, so only the directory's
/// file records take part in the comparison.
pub fn directory_matches_archive<S: AsRef<str>>(
    dir: &Path,
    archive_path: &Path,
    exclude_patterns: &[S],
) -> Result<bool> {
    let directory = snapshot_directory(dir, exclude_patterns)?.files_only();
    let archive = snapshot_archive(archive_path)?;
    Ok(compare(&directory, &archive))
}

/// One way in which two snapshots differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", content = "path", rename_all = "lowercase")]
pub enum SnapshotDifference {
    /// Only in the second snapshot
    Added(String),
    /// Only in the first snapshot
    Removed(String),
    /// In both, with different size, kind or content
    Modified(String),
}

impl SnapshotDifference {
    /// Relative path the difference is about
    pub fn path(&self) -> &str {
        match self {
            SnapshotDifference::Added(path)
            | SnapshotDifference::Removed(path)
            | SnapshotDifference::Modified(path) => path,
        }
    }
}

impl fmt::Display for SnapshotDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotDifference::Added(path) => write!(f, "+ {path}"),
            SnapshotDifference::Removed(path) => write!(f, "- {path}"),
            SnapshotDifference::Modified(path) => write!(f, "~ {path}"),
        }
    }
}

/// List what changed going from `a` to `b`, in path order
///
/// Empty exactly when [`compare`] returns true.
pub fn diff_snapshots(a: &DirectorySnapshot, b: &DirectorySnapshot) -> Vec<SnapshotDifference> {
    let mut differences = Vec::new();
    let mut left = a.records.iter().peekable();
    let mut right = b.records.iter().peekable();

    loop {
        match (left.peek(), right.peek()) {
            (Some(x), Some(y)) => match x.relative_path.cmp(&y.relative_path) {
                Ordering::Less => {
                    differences.push(SnapshotDifference::Removed(x.relative_path.clone()));
                    left.next();
                }
                Ordering::Greater => {
                    differences.push(SnapshotDifference::Added(y.relative_path.clone()));
                    right.next();
                }
                Ordering::Equal => {
                    if !x.same_content(y) {
                        differences.push(SnapshotDifference::Modified(x.relative_path.clone()));
                    }
                    left.next();
                    right.next();
                }
            },
            (Some(x), None) => {
                differences.push(SnapshotDifference::Removed(x.relative_path.clone()));
                left.next();
            }
            (None, Some(y)) => {
                differences.push(SnapshotDifference::Added(y.relative_path.clone()));
                right.next();
            }
            (None, None) => break,
        }
    }

    differences
}

/// Drop sub-second precision, rounding towards the past
fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => UNIX_EPOCH + Duration::from_secs(since.as_secs()),
        Err(before) => {
            let before = before.duration();
            let secs = before.as_secs() + u64::from(before.subsec_nanos() > 0);
            UNIX_EPOCH
                .checked_sub(Duration::from_secs(secs))
                .unwrap_or(UNIX_EPOCH)
        }
    }
}

/// Zip timestamps carry no zone; they are read as UTC
fn zip_time_to_system(stamp: zip::DateTime) -> SystemTime {
    NaiveDate::from_ymd_opt(
        i32::from(stamp.year()),
        u32::from(stamp.month()),
        u32::from(stamp.day()),
    )
    .and_then(|date| {
        date.and_hms_opt(
            u32::from(stamp.hour()),
            u32::from(stamp.minute()),
            u32::from(stamp.second()),
        )
    })
    .map_or(UNIX_EPOCH, |naive| SystemTime::from(naive.and_utc()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    fn record(path: &str, size: u64, hash: Option<&str>) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            size,
            modified_time: UNIX_EPOCH,
            is_directory: hash.is_none(),
            content_hash: hash.map(str::to_string),
        }
    }

    #[test]
    fn test_snapshot_directory_records() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("b.txt"), b"bee").unwrap();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("a/inner.txt"), b"x").unwrap();

        let snapshot = snapshot_directory(root, &[] as &[&str]).unwrap();
        let paths: Vec<&str> = snapshot.records().iter().map(|r| r.relative_path.as_str()).collect();

        assert_eq!(paths, vec!["a", "a/inner.txt", "b.txt"]);

        let dir = snapshot.get("a").unwrap();
        assert!(dir.is_directory);
        assert_eq!(dir.size, 0);
        assert!(dir.content_hash.is_none());

        let file = snapshot.get("b.txt").unwrap();
        assert_eq!(file.size, 3);
        assert_eq!(file.content_hash.as_deref(), Some(crate::hash::hash_content(b"bee").as_str()));
    }

    #[test]
    fn test_snapshot_mtime_truncated() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("f"), b"x").unwrap();

        let snapshot = snapshot_directory(temp.path(), &[] as &[&str]).unwrap();
        let since = snapshot.records()[0]
            .modified_time
            .duration_since(UNIX_EPOCH)
            .unwrap();
        assert_eq!(since.subsec_nanos(), 0);
    }

    #[test]
    fn test_snapshot_excludes_git() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.txt"), b"x").unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".git/config"), b"[core]").unwrap();

        let snapshot = snapshot_directory(root, &[".git/"]).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.records()[0].relative_path, "a.txt");
    }

    #[test]
    fn test_compare_reflexive() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("d")).unwrap();
        fs::write(temp.path().join("d/f"), b"content").unwrap();

        let a = snapshot_directory(temp.path(), &[] as &[&str]).unwrap();
        let b = snapshot_directory(temp.path(), &[] as &[&str]).unwrap();
        assert!(compare(&a, &b));
        assert!(diff_snapshots(&a, &b).is_empty());
    }

    #[test]
    fn test_compare_detects_single_byte_change() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("data.bin");
        fs::write(&file, b"abcdef").unwrap();
        let before = snapshot_directory(temp.path(), &[] as &[&str]).unwrap();

        fs::write(&file, b"abcdeg").unwrap();
        let after = snapshot_directory(temp.path(), &[] as &[&str]).unwrap();

        assert_ne!(before.records()[0].content_hash, after.records()[0].content_hash);
        assert!(!compare(&before, &after));
        assert_eq!(
            diff_snapshots(&before, &after),
            vec![SnapshotDifference::Modified("data.bin".into())]
        );
    }

    #[test]
    fn test_compare_ignores_mtime() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("touched.txt");
        fs::write(&file, b"same").unwrap();
        let before = snapshot_directory(temp.path(), &[] as &[&str]).unwrap();

        let later = SystemTime::now() + Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(later)
            .unwrap();
        let after = snapshot_directory(temp.path(), &[] as &[&str]).unwrap();

        assert_ne!(before.records()[0].modified_time, after.records()[0].modified_time);
        assert!(compare(&before, &after));
    }

    #[test]
    fn test_compare_count_mismatch() {
        let a = DirectorySnapshot::new(vec![record("a", 1, Some("h"))]);
        let b = DirectorySnapshot::new(vec![record("a", 1, Some("h")), record("b", 1, Some("h"))]);
        assert!(!compare(&a, &b));
    }

    #[test]
    fn test_compare_directories_ignore_hash() {
        let mut x = record("dir", 0, None);
        let mut y = record("dir", 0, None);
        x.content_hash = Some("stale".into());
        y.content_hash = None;

        assert!(compare(
            &DirectorySnapshot::new(vec![x]),
            &DirectorySnapshot::new(vec![y])
        ));
    }

    #[test]
    fn test_snapshot_sorted_regardless_of_input_order() {
        let snapshot = DirectorySnapshot::new(vec![
            record("z", 1, Some("h")),
            record("a", 1, Some("h")),
            record("m", 1, Some("h")),
        ]);
        let paths: Vec<&str> = snapshot.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_snapshot_archive_skips_directories() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("a.zip");
        write_zip(&archive, &[("docs/", ""), ("docs/readme.md", "# hi"), ("a.txt", "x")]);

        let snapshot = snapshot_archive(&archive).unwrap();

        assert_eq!(snapshot.len(), 2);
        let readme = snapshot.get("docs/readme.md").unwrap();
        assert_eq!(readme.size, 4);
        assert_eq!(readme.content_hash.as_deref(), Some(crate::hash::hash_content(b"# hi").as_str()));
        assert!(!readme.is_directory);
    }

    #[test]
    fn test_directory_matches_archive_with_exclusion() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("d");
        fs::create_dir_all(dir.join(".git")).unwrap();
        fs::write(dir.join("a.txt"), b"x").unwrap();
        fs::write(dir.join(".git/config"), b"[core]").unwrap();

        let archive = temp.path().join("d.zip");
        write_zip(&archive, &[("a.txt", "x")]);

        assert!(directory_matches_archive(&dir, &archive, &[".git/"]).unwrap());
        assert!(!directory_matches_archive(&dir, &archive, &[] as &[&str]).unwrap());
    }

    #[test]
    fn test_directory_matches_archive_nested_files() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("site");
        fs::create_dir_all(dir.join("css")).unwrap();
        fs::write(dir.join("index.html"), b"<html>").unwrap();
        fs::write(dir.join("css/main.css"), b"body{}").unwrap();

        let archive = temp.path().join("site.zip");
        write_zip(
            &archive,
            &[("css/", ""), ("css/main.css", "body{}"), ("index.html", "<html>")],
        );
        assert!(directory_matches_archive(&dir, &archive, &[] as &[&str]).unwrap());

        fs::write(dir.join("css/main.css"), b"body{ }").unwrap();
        assert!(!directory_matches_archive(&dir, &archive, &[] as &[&str]).unwrap());
    }

    #[test]
    fn test_snapshot_archive_malformed() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("bogus.zip");
        fs::write(&bogus, b"this is not a zip file").unwrap();

        assert!(matches!(
            snapshot_archive(&bogus),
            Err(Error::MalformedArchive { .. })
        ));
    }

    #[test]
    fn test_snapshot_archive_missing() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            snapshot_archive(&temp.path().join("missing.zip")),
            Err(Error::NotFound { op: "open archive", .. })
        ));
    }

    #[test]
    fn test_diff_snapshots_added_removed() {
        let a = DirectorySnapshot::new(vec![record("gone", 1, Some("h")), record("kept", 1, Some("h"))]);
        let b = DirectorySnapshot::new(vec![record("kept", 1, Some("h")), record("new", 1, Some("h"))]);

        let diff = diff_snapshots(&a, &b);
        assert_eq!(
            diff,
            vec![
                SnapshotDifference::Removed("gone".into()),
                SnapshotDifference::Added("new".into()),
            ]
        );
        assert_eq!(diff[0].to_string(), "- gone");
        assert_eq!(diff[1].path(), "new");
    }

    #[test]
    fn test_zip_time_conversion() {
        let stamp = zip::DateTime::from_date_and_time(2024, 2, 29, 13, 45, 10).unwrap();
        let time = zip_time_to_system(stamp);
        let utc = DateTime::<Utc>::from(time);
        assert_eq!(utc.to_rfc3339(), "2024-02-29T13:45:10+00:00");
    }

    #[test]
    fn test_truncate_before_epoch() {
        let time = UNIX_EPOCH - Duration::from_millis(1500);
        assert_eq!(truncate_to_seconds(time), UNIX_EPOCH - Duration::from_secs(2));
    }

    #[test]
    fn test_record_serializes_time_as_rfc3339() {
        let json = serde_json::to_value(record("f", 1, Some("h"))).unwrap();
        assert_eq!(json["modified_time"], "1970-01-01T00:00:00+00:00");
        assert_eq!(json["content_hash"], "h");
    }

    #[test]
    fn test_difference_serialization() {
        let json = serde_json::to_value(SnapshotDifference::Added("x".into())).unwrap();
        assert_eq!(json, serde_json::json!({"change": "added", "path": "x"}));
    }
}
