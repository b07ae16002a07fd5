//! Registry of resources that must be released
//!
//! A [`ResourceManager`] tracks temp files, temp directories and caller-defined
//! cleanup actions. Releasing is best-effort-complete: every tracked resource
//! is attempted even when earlier ones fail, and all failures are reported.
//!
//! The registry is behind a mutex and clones of a manager share it, so a
//! manager can be handed to worker threads. Cleanup actions always run outside
//! the lock and may therefore use the manager themselves.

use crate::cancel::CancellationToken;
use crate::{BoxError, Error, Result};
use std::fmt;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Cleanup action of a [`Resource::Custom`]
pub type CleanupFn = Arc<dyn Fn() -> std::result::Result<(), BoxError> + Send + Sync>;

/// Kind of a tracked resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// [`Resource::TempFile`]
    TempFile,
    /// [`Resource::TempDir`]
    TempDir,
    /// [`Resource::Custom`]
    Custom,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::TempFile => "temp file",
            ResourceKind::TempDir => "temp dir",
            ResourceKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Named caller-defined cleanup action
///
/// Two custom resources are equal only if they share the same name and the
/// same action (clones of one resource, not two closures that happen to do
/// the same thing).
#[derive(Clone)]
pub struct CustomResource {
    name: String,
    action: CleanupFn,
}

impl CustomResource {
    /// Name `action` for display and error reports
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            action: Arc::new(action),
        }
    }

    /// Name given at creation
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomResource")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CustomResource {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.action, &other.action)
    }
}

/// Something acquired that needs explicit release
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// File removed on cleanup
    TempFile(PathBuf),
    /// Directory removed recursively on cleanup
    TempDir(PathBuf),
    /// Caller-defined action
    Custom(CustomResource),
}

impl Resource {
    /// Wrap a closure as a resource
    pub fn custom<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        Resource::Custom(CustomResource::new(name, action))
    }

    /// Kind of this resource
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::TempFile(_) => ResourceKind::TempFile,
            Resource::TempDir(_) => ResourceKind::TempDir,
            Resource::Custom(_) => ResourceKind::Custom,
        }
    }

    /// Path of a temp file or directory
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resource::TempFile(path) | Resource::TempDir(path) => Some(path),
            Resource::Custom(_) => None,
        }
    }

    /// Release the resource
    ///
    /// Removing a temp file or directory that is already gone succeeds.
    pub fn cleanup(&self) -> Result<()> {
        match self {
            Resource::TempFile(path) => {
                ignore_not_found(fs::remove_file(path))
                    .map_err(|e| Error::from_io("remove temp file", path, e))
            }
            Resource::TempDir(path) => {
                ignore_not_found(fs::remove_dir_all(path))
                    .map_err(|e| Error::from_io("remove temp dir", path, e))
            }
            Resource::Custom(custom) => (custom.action)().map_err(|source| Error::Cleanup {
                resource: custom.name.clone(),
                source,
            }),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::TempFile(path) | Resource::TempDir(path) => {
                write!(f, "{}: {}", self.kind(), path.display())
            }
            Resource::Custom(custom) => write!(f, "{}: {}", self.kind(), custom.name),
        }
    }
}

fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Thread-safe registry of resources
///
/// Cloning yields a handle to the same registry.
///
/// # Examples
///
/// ```no_run
/// use fsguard_engine::ResourceManager;
///
/// # fn main() -> fsguard_engine::Result<()> {
/// let resources = ResourceManager::new();
/// let scratch = resources.create_temp_dir("fsguard-")?;
/// // ... work inside `scratch` ...
/// resources.cleanup()?;
/// assert!(!scratch.exists());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceManager {
    resources: Arc<Mutex<Vec<Resource>>>,
}

impl ResourceManager {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // Only plain Vec operations run under the lock; caller code never does.
    fn lock(&self) -> MutexGuard<'_, Vec<Resource>> {
        self.resources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a resource; cleanup runs in registration order
    pub fn add(&self, resource: Resource) {
        debug!(resource = %resource, "Tracking resource");
        self.lock().push(resource);
    }

    /// Track a temp file
    pub fn add_temp_file(&self, path: impl Into<PathBuf>) {
        self.add(Resource::TempFile(path.into()));
    }

    /// Track a temp directory
    pub fn add_temp_dir(&self, path: impl Into<PathBuf>) {
        self.add(Resource::TempDir(path.into()));
    }

    /// Track a named cleanup closure
    pub fn add_custom<F>(&self, name: impl Into<String>, action: F)
    where
        F: Fn() -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.add(Resource::custom(name, action));
    }

    /// Stop tracking a resource without releasing it
    ///
    /// Returns whether the resource was tracked.
    pub fn remove(&self, resource: &Resource) -> bool {
        let mut resources = self.lock();
        match resources.iter().position(|r| r == resource) {
            Some(index) => {
                resources.remove(index);
                debug!(resource = %resource, "Released resource from tracking");
                true
            }
            None => false,
        }
    }

    /// Number of tracked resources
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the tracked resources in registration order
    pub fn list(&self) -> Vec<Resource> {
        self.lock().clone()
    }

    /// Tracked resources of one kind, in registration order
    pub fn list_by_kind(&self, kind: ResourceKind) -> Vec<Resource> {
        self.lock()
            .iter()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect()
    }

    /// Create an empty file in `dir` and track it
    pub fn create_temp_file(&self, dir: &Path, prefix: &str) -> Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .tempfile_in(dir)
            .map_err(|e| Error::from_io("create temp file", dir, e))?;
        let (_, path) = file
            .keep()
            .map_err(|e| Error::from_io("create temp file", dir, e.error))?;

        self.add_temp_file(path.clone());
        Ok(path)
    }

    /// Create a directory under the system temp dir and track it
    pub fn create_temp_dir(&self, prefix: &str) -> Result<PathBuf> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|e| Error::from_io("create temp dir", std::env::temp_dir(), e))?
            .keep();

        self.add_temp_dir(dir.clone());
        Ok(dir)
    }

    /// Release every tracked resource and empty the registry
    ///
    /// A failing resource does not stop the others. One failure is returned
    /// as-is, several as [`Error::Aggregate`].
    pub fn cleanup(&self) -> Result<()> {
        let drained = std::mem::take(&mut *self.lock());
        into_result(release_all(drained, false))
    }

    /// Like [`cleanup`](Self::cleanup), but a panicking cleanup becomes an
    /// [`Error::PanicDuringCleanup`] and the remaining resources are still
    /// released
    pub fn cleanup_with_panic_isolation(&self) -> Result<()> {
        let drained = std::mem::take(&mut *self.lock());
        into_result(release_all(drained, true))
    }

    /// Release and stop tracking only the resources matching `predicate`
    ///
    /// The predicate runs on a copy of the registry without holding the lock,
    /// so it may use this manager. If it panics, nothing is untracked.
    pub fn cleanup_if<P>(&self, predicate: P) -> Result<()>
    where
        P: Fn(&Resource) -> bool,
    {
        let mut matching: Vec<Resource> = self.list().into_iter().filter(|r| predicate(r)).collect();

        // Entries removed concurrently since the copy are someone else's to release
        {
            let mut resources = self.lock();
            matching.retain(|candidate| match resources.iter().position(|r| r == candidate) {
                Some(index) => {
                    resources.remove(index);
                    true
                }
                None => false,
            });
        }
        into_result(release_all(matching, false))
    }

    /// Release everything, reporting cancellation if `token` was cancelled
    ///
    /// Cancellation stops new work, never the release of what is already
    /// held, so cleanup always runs. [`Error::Cancelled`] comes first in the
    /// combined error.
    pub fn cleanup_with_cancellation(&self, token: &CancellationToken) -> Result<()> {
        let mut errors = Vec::new();
        if token.is_cancelled() {
            debug!("Cleanup requested after cancellation");
            errors.push(Error::Cancelled);
        }
        if let Err(e) = self.cleanup_with_panic_isolation() {
            errors.push(e);
        }
        into_result(errors)
    }

    /// Guard that releases everything when dropped
    pub fn guard(&self) -> CleanupGuard<'_> {
        CleanupGuard::new(self)
    }
}

fn release_all(resources: Vec<Resource>, isolate_panics: bool) -> Vec<Error> {
    if !resources.is_empty() {
        debug!(count = resources.len(), "Releasing resources");
    }

    let mut errors = Vec::new();
    for resource in resources {
        let result = if isolate_panics {
            release_isolated(&resource)
        } else {
            resource.cleanup()
        };

        if let Err(e) = result {
            warn!(resource = %resource, error = %e, "Cleanup failed");
            errors.push(e);
        }
    }
    errors
}

fn release_isolated(resource: &Resource) -> Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| resource.cleanup())) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(Error::PanicDuringCleanup {
                resource: resource.to_string(),
                message,
            })
        }
    }
}

fn into_result(errors: Vec<Error>) -> Result<()> {
    match Error::combine(errors) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Releases a manager's resources when it goes out of scope
///
/// Cleanup is panic-isolated; failures are logged since `drop` cannot return
/// them. Call [`defuse`](Self::defuse) to keep the resources.
#[must_use = "the guard releases resources when dropped"]
#[derive(Debug)]
pub struct CleanupGuard<'a> {
    manager: &'a ResourceManager,
    armed: bool,
}

impl<'a> CleanupGuard<'a> {
    pub fn new(manager: &'a ResourceManager) -> Self {
        Self {
            manager,
            armed: true,
        }
    }

    /// Do not release anything on drop
    pub fn defuse(&mut self) {
        self.armed = false;
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.manager.cleanup_with_panic_isolation() {
            warn!(error = %e, "Deferred cleanup reported errors");
        }
    }
}
