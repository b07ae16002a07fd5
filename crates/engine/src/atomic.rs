//! All-or-nothing file writes
//!
//! [`AtomicWriter`] writes into a temp file next to the target and renames it
//! over the target on [`commit`](AtomicWriter::commit). Readers of the target
//! see either the old content (or no file) or the complete new content, never
//! a partial write.
//!
//! The temp file lives in the target's directory so the final rename never
//! crosses a filesystem. It is named `.<target name>.<random>.tmp`.
//!
//! Lifecycle:
//!
//! ```text
//! open ──> Open ──commit ok──> Committed
//!           │  └─commit err──> Closed      (temp deleted, error returned)
//!           └────rollback────> RolledBack  (temp deleted)
//! ```
//!
//! `close` and dropping an Open writer roll back, so forgetting to commit
//! leaves the target untouched and no temp file behind.

use crate::resources::{Resource, ResourceManager};
use crate::{Error, Result};
use fsguard_core::validate::validate_path;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Longest file name most filesystems accept, in bytes
const MAX_FILE_NAME_LEN: usize = 255;
const TEMP_RAND_LEN: usize = 6;
const TEMP_SUFFIX: &str = ".tmp";

/// State of an [`AtomicWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Accepting writes
    Open,
    /// Target replaced
    Committed,
    /// Temp file discarded, target untouched
    RolledBack,
    /// Done after a failed commit or an explicit close
    Closed,
}

impl WriterState {
    /// Lowercase name used in error messages
    pub fn as_str(self) -> &'static str {
        match self {
            WriterState::Open => "open",
            WriterState::Committed => "committed",
            WriterState::RolledBack => "rolled back",
            WriterState::Closed => "closed",
        }
    }
}

/// Single-use writer that replaces a file atomically
///
/// # Examples
///
/// ```no_run
/// use fsguard_engine::AtomicWriter;
///
/// # fn main() -> fsguard_engine::Result<()> {
/// let mut writer = AtomicWriter::open("out/report.txt")?;
/// writer.write(b"line 1\n")?;
/// writer.write(b"line 2\n")?;
/// writer.commit()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AtomicWriter {
    target: PathBuf,
    temp: Option<NamedTempFile>,
    state: WriterState,
    tracker: Option<(ResourceManager, Resource)>,
}

impl AtomicWriter {
    /// Start writing `target`
    ///
    /// The target path is validated and its parent directory created if
    /// missing. The target itself is not touched until commit.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPath`] for unsafe paths, or the classified I/O error if
    /// the parent or the temp file cannot be created.
    pub fn open(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref();
        validate_path(target)?;

        let file_name = target.file_name().ok_or_else(|| Error::InvalidPath {
            path: target.display().to_string(),
            reason: "path has no file name",
        })?;

        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| Error::from_io("create parent directory", parent, e))?;

        let temp = tempfile::Builder::new()
            .prefix(&temp_prefix(&file_name.to_string_lossy()))
            .rand_bytes(TEMP_RAND_LEN)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(parent)
            .map_err(|e| Error::from_io("create temp file", parent, e))?;

        if let Some(permissions) = initial_permissions(target) {
            temp.as_file()
                .set_permissions(permissions)
                .map_err(|e| Error::from_io("set permissions", temp.path().to_path_buf(), e))?;
        }

        debug!(
            target = %target.display(),
            temp = %temp.path().display(),
            "Opened atomic writer"
        );

        Ok(Self {
            target: target.to_path_buf(),
            temp: Some(temp),
            state: WriterState::Open,
            tracker: None,
        })
    }

    /// Like [`open`](Self::open), and track the temp file in `manager`
    ///
    /// The temp file is released from tracking once commit or rollback has
    /// dealt with it, so cleaning up the manager only removes temp files of
    /// writers that were leaked.
    pub fn open_tracked(target: impl AsRef<Path>, manager: &ResourceManager) -> Result<Self> {
        let mut writer = Self::open(target)?;
        if let Some(temp) = writer.temp_path() {
            let resource = Resource::TempFile(temp.to_path_buf());
            manager.add(resource.clone());
            writer.tracker = Some((manager.clone(), resource));
        }
        Ok(writer)
    }

    /// Current state
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// File that commit replaces
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path of the temp file while the writer is open
    pub fn temp_path(&self) -> Option<&Path> {
        self.temp.as_ref().map(NamedTempFile::path)
    }

    fn open_temp(&mut self, op: &'static str) -> Result<&mut NamedTempFile> {
        match (&mut self.temp, self.state) {
            (Some(temp), WriterState::Open) => Ok(temp),
            _ => Err(Error::InvalidState {
                op,
                state: self.state.as_str(),
            }),
        }
    }

    /// Append bytes to the pending content
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let temp = self.open_temp("write")?;
        temp.write_all(bytes)
            .map_err(|e| Error::from_io("write", temp.path().to_path_buf(), e))?;
        Ok(bytes.len())
    }

    /// Set the permissions the target will have after commit
    pub fn set_permissions(&mut self, permissions: fs::Permissions) -> Result<()> {
        let temp = self.open_temp("set permissions on")?;
        temp.as_file()
            .set_permissions(permissions)
            .map_err(|e| Error::from_io("set permissions", temp.path().to_path_buf(), e))
    }

    /// Make the write durable and replace the target
    ///
    /// Flushes and syncs the temp file, closes it, then renames it over the
    /// target. On failure the temp file is deleted, the writer ends up
    /// [`Closed`](WriterState::Closed) and the error is returned as-is; there
    /// is no retry.
    pub fn commit(&mut self) -> Result<()> {
        self.open_temp("commit")?;
        let Some(temp) = self.temp.take() else {
            return Err(Error::InvalidState {
                op: "commit",
                state: self.state.as_str(),
            });
        };

        let result = persist(temp, &self.target);
        self.untrack();

        match result {
            Ok(()) => {
                self.state = WriterState::Committed;
                debug!(target = %self.target.display(), "Committed atomic write");
                Ok(())
            }
            Err(e) => {
                self.state = WriterState::Closed;
                debug!(target = %self.target.display(), error = %e, "Atomic commit failed");
                Err(e)
            }
        }
    }

    /// Discard the pending content and delete the temp file
    pub fn rollback(&mut self) -> Result<()> {
        self.open_temp("roll back")?;
        let Some(temp) = self.temp.take() else {
            return Err(Error::InvalidState {
                op: "roll back",
                state: self.state.as_str(),
            });
        };

        let temp_path = temp.path().to_path_buf();
        self.state = WriterState::RolledBack;
        let result = temp
            .close()
            .map_err(|e| Error::from_io("remove temp file", temp_path, e));
        self.untrack();

        debug!(target = %self.target.display(), "Rolled back atomic write");
        result
    }

    /// Roll back if still open, otherwise do nothing
    pub fn close(&mut self) -> Result<()> {
        if self.state == WriterState::Open {
            self.rollback()
        } else {
            Ok(())
        }
    }

    fn untrack(&mut self) {
        if let Some((manager, resource)) = self.tracker.take() {
            manager.remove(&resource);
        }
    }
}

/// `.<name>.` with `name` cut on a char boundary so the full temp name fits
/// in [`MAX_FILE_NAME_LEN`]
fn temp_prefix(name: &str) -> String {
    // Two dots around the name
    let budget = MAX_FILE_NAME_LEN - 2 - TEMP_RAND_LEN - TEMP_SUFFIX.len();
    let mut end = name.len().min(budget);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    format!(".{}.", &name[..end])
}

/// Permissions the temp file starts with: those of the file being replaced,
/// or `0o644` for a new file on Unix (temp files are created owner-only)
fn initial_permissions(target: &Path) -> Option<fs::Permissions> {
    if let Ok(metadata) = fs::metadata(target) {
        return metadata.is_file().then(|| metadata.permissions());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(fs::Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

fn persist(mut temp: NamedTempFile, target: &Path) -> Result<()> {
    temp.flush()
        .map_err(|e| Error::from_io("flush", temp.path().to_path_buf(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::from_io("sync", temp.path().to_path_buf(), e))?;

    // Close the handle before renaming; dropping the TempPath on error deletes it
    temp.into_temp_path()
        .persist(target)
        .map_err(|e| Error::from_io("rename", target, e.error))
}

impl Write for AtomicWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        AtomicWriter::write(self, buf).map_err(into_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        let temp = self.open_temp("flush").map_err(into_io_error)?;
        temp.flush()
    }
}

fn into_io_error(error: Error) -> io::Error {
    match error {
        Error::NotFound { source, .. }
        | Error::PermissionDenied { source, .. }
        | Error::AlreadyExists { source, .. }
        | Error::Io { source, .. } => source,
        other => io::Error::other(other),
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(target = %self.target.display(), error = %e, "Failed to discard uncommitted write");
        }
    }
}

/// Atomically replace `path` with `bytes`
///
/// `mode` sets Unix permission bits on the new file and is ignored elsewhere.
/// On any error the temp file is already gone and the target untouched.
///
/// # Examples
///
/// ```no_run
/// use fsguard_engine::atomic_write_file;
///
/// # fn main() -> fsguard_engine::Result<()> {
/// atomic_write_file("bin/run.sh", b"#!/bin/sh\necho hi\n", Some(0o755))?;
/// # Ok(())
/// # }
/// ```
pub fn atomic_write_file(path: impl AsRef<Path>, bytes: &[u8], mode: Option<u32>) -> Result<()> {
    let mut writer = AtomicWriter::open(path)?;
    writer.write(bytes)?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        writer.set_permissions(fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    writer.commit()
}

/// Atomically replace `dst` with a copy of `src`, keeping its permissions
///
/// Returns the number of bytes copied.
pub fn atomic_copy(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<u64> {
    let src = src.as_ref();
    validate_path(src)?;

    let mut source = File::open(src).map_err(|e| Error::from_io("open", src, e))?;
    let permissions = source
        .metadata()
        .map_err(|e| Error::from_io("stat", src, e))?
        .permissions();

    let mut writer = AtomicWriter::open(dst)?;
    let copied = {
        let temp = writer.open_temp("copy into")?;
        io::copy(&mut source, temp).map_err(|e| Error::from_io("copy", src, e))?
    };
    writer.set_permissions(permissions)?;
    writer.commit()?;

    debug!(src = %src.display(), dst = %writer.target().display(), bytes = copied, "Copied atomically");
    Ok(copied)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use tempfile::TempDir;

    /// Files in `dir` that look like writer temp files
    fn leftover_temps(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_write_and_commit() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out.txt");

        let mut writer = AtomicWriter::open(&target).unwrap();
        assert_eq!(writer.state(), WriterState::Open);
        assert_eq!(writer.write(b"hello ").unwrap(), 6);
        assert_eq!(writer.write(b"world").unwrap(), 5);
        assert!(!target.exists());

        writer.commit().unwrap();

        assert_eq!(writer.state(), WriterState::Committed);
        assert_eq!(fs::read(&target).unwrap(), b"hello world");
        assert!(leftover_temps(temp.path()).is_empty());
    }

    #[test]
    fn test_temp_file_in_target_directory() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("config.toml");

        let writer = AtomicWriter::open(&target).unwrap();
        let temp_path = writer.temp_path().unwrap();

        assert_eq!(temp_path.parent().unwrap(), temp.path());
        let name = temp_path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(".config.toml."));
        assert!(name.ends_with(".tmp"));
    }

    #[test]
    fn test_commit_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("data");
        fs::write(&target, b"old content that is longer").unwrap();

        let mut writer = AtomicWriter::open(&target).unwrap();
        writer.write(b"new").unwrap();
        writer.commit().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn test_rollback_leaves_target_unchanged() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("data");
        fs::write(&target, b"original").unwrap();

        let mut writer = AtomicWriter::open(&target).unwrap();
        writer.write(b"discarded").unwrap();
        writer.rollback().unwrap();

        assert_eq!(writer.state(), WriterState::RolledBack);
        assert_eq!(fs::read(&target).unwrap(), b"original");
        assert!(leftover_temps(temp.path()).is_empty());
    }

    #[test]
    fn test_drop_without_commit_leaves_no_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("never.txt");

        {
            let mut writer = AtomicWriter::open(&target).unwrap();
            writer.write(b"partial").unwrap();
        }

        assert!(!target.exists());
        assert!(leftover_temps(temp.path()).is_empty());
    }

    #[test]
    fn test_close_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("x");

        let mut writer = AtomicWriter::open(&target).unwrap();
        writer.close().unwrap();
        assert_eq!(writer.state(), WriterState::RolledBack);
        writer.close().unwrap();
        assert_eq!(writer.state(), WriterState::RolledBack);

        let mut committed = AtomicWriter::open(&target).unwrap();
        committed.commit().unwrap();
        committed.close().unwrap();
        assert_eq!(committed.state(), WriterState::Committed);
        assert!(target.exists());
    }

    #[test]
    fn test_operations_outside_open_state() {
        let temp = TempDir::new().unwrap();
        let mut writer = AtomicWriter::open(temp.path().join("x")).unwrap();
        writer.commit().unwrap();

        assert!(matches!(
            writer.write(b"late"),
            Err(Error::InvalidState { op: "write", state: "committed" })
        ));
        assert!(matches!(writer.commit(), Err(Error::InvalidState { .. })));
        assert!(matches!(writer.rollback(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("a/b/c/out.txt");

        let mut writer = AtomicWriter::open(&target).unwrap();
        writer.write(b"deep").unwrap();
        writer.commit().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"deep");
    }

    #[test]
    fn test_open_rejects_unsafe_paths() {
        assert!(matches!(
            AtomicWriter::open("../escape.txt"),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            AtomicWriter::open("~/secrets"),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(AtomicWriter::open(""), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_failed_commit_cleans_up_and_closes() {
        let temp = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file
        let target = temp.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        let mut writer = AtomicWriter::open(&target).unwrap();
        writer.write(b"data").unwrap();
        let err = writer.commit().unwrap_err();

        assert!(!matches!(err, Error::InvalidState { .. }));
        assert_eq!(writer.state(), WriterState::Closed);
        assert!(target.join("keep").exists());
        assert!(leftover_temps(temp.path()).is_empty());
    }

    #[test]
    fn test_io_write_composes_with_copy() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("copied");

        let mut writer = AtomicWriter::open(&target).unwrap();
        let mut input: &[u8] = b"streamed bytes";
        io::copy(&mut input, &mut writer).unwrap();
        writer.commit().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"streamed bytes");
    }

    #[test]
    fn test_open_tracked_registers_until_resolved() {
        let temp = TempDir::new().unwrap();
        let manager = ResourceManager::new();

        let mut writer = AtomicWriter::open_tracked(temp.path().join("a"), &manager).unwrap();
        assert_eq!(manager.count(), 1);
        writer.commit().unwrap();
        assert_eq!(manager.count(), 0);

        let mut writer = AtomicWriter::open_tracked(temp.path().join("b"), &manager).unwrap();
        writer.rollback().unwrap();
        assert_eq!(manager.count(), 0);
    }

    #[test]
    fn test_leaked_tracked_writer_cleaned_by_manager() {
        let temp = TempDir::new().unwrap();
        let manager = ResourceManager::new();

        let writer = AtomicWriter::open_tracked(temp.path().join("leak"), &manager).unwrap();
        let temp_path = writer.temp_path().unwrap().to_path_buf();
        std::mem::forget(writer);
        assert!(temp_path.exists());

        manager.cleanup().unwrap();
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_atomic_write_file_roundtrip() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("file.bin");
        let bytes: Vec<u8> = (0..=255).collect();

        atomic_write_file(&target, &bytes, None).unwrap();

        assert_eq!(fs::read(&target).unwrap(), bytes);
        assert!(leftover_temps(temp.path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_commit_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let target = temp.path().join("tool");
        fs::write(&target, b"v1").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o755)).unwrap();

        atomic_write_file(&target, b"v2", None).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"v2");
        assert_eq!(fs::metadata(&target).unwrap().permissions().mode() & 0o777, 0o755);
    }

    #[test]
    fn test_atomic_write_file_empty() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("empty");

        atomic_write_file(&target, b"", None).unwrap();
        assert_eq!(fs::metadata(&target).unwrap().len(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let target = temp.path().join("script.sh");

        atomic_write_file(&target, b"#!/bin/sh\n", Some(0o750)).unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_copy_keeps_content_and_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.sh");
        let dst = temp.path().join("out/dst.sh");
        fs::write(&src, b"echo copy").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o741)).unwrap();

        let copied = atomic_copy(&src, &dst).unwrap();

        assert_eq!(copied, 9);
        assert_eq!(fs::read(&dst).unwrap(), b"echo copy");
        assert_eq!(fs::metadata(&dst).unwrap().permissions().mode() & 0o777, 0o741);
        assert!(leftover_temps(&temp.path().join("out")).is_empty());
    }

    #[test]
    fn test_atomic_copy_missing_source() {
        let temp = TempDir::new().unwrap();
        let dst = temp.path().join("dst");

        let err = atomic_copy(temp.path().join("missing"), &dst).unwrap_err();

        assert!(matches!(err, Error::NotFound { op: "open", .. }));
        assert!(!dst.exists());
    }

    #[test]
    fn test_long_file_name() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("n".repeat(250));

        atomic_write_file(&target, b"long", None).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"long");
        assert!(leftover_temps(temp.path()).is_empty());
    }

    #[test]
    fn test_temp_prefix_fits_name_limit() {
        assert_eq!(temp_prefix("notes.txt"), ".notes.txt.");

        let long = "n".repeat(255);
        let prefix = temp_prefix(&long);
        assert_eq!(prefix.len() + TEMP_RAND_LEN + TEMP_SUFFIX.len(), MAX_FILE_NAME_LEN);

        // 3-byte chars: the cut backs off to a boundary
        let wide = "語".repeat(85);
        let prefix = temp_prefix(&wide);
        assert!(prefix.len() + TEMP_RAND_LEN + TEMP_SUFFIX.len() <= MAX_FILE_NAME_LEN);
        assert!(prefix.starts_with(".語"));
    }
}
