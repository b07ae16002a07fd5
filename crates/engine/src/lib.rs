//! # fsguard Engine
//!
//! Transactional file operations for the fsguard CLI.
//!
//! This crate provides:
//!
//! - **Traversal**: Depth-first walks with exclusion, depth, symlink and hidden-file policy
//! - **Atomic Writes**: Temp-file-and-rename writers that never leave partial targets
//! - **Snapshots**: Hash-annotated views of directories and zip archives, and their comparison
//! - **Resources**: A thread-safe registry that releases temp artifacts best-effort-complete
//! - **Cancellation**: A shared flag for cooperative cancellation

pub mod atomic;
pub mod cancel;
pub mod hash;
pub mod resources;
pub mod snapshot;
pub mod walk;

// Re-export error types from core
pub use fsguard_core::{BoxError, Error, Result};

// Re-export commonly used types
pub use atomic::{AtomicWriter, WriterState, atomic_copy, atomic_write_file};
pub use cancel::CancellationToken;
pub use resources::{CleanupGuard, CustomResource, Resource, ResourceKind, ResourceManager};
pub use snapshot::{
    DirectorySnapshot, FileRecord, SnapshotDifference, compare, diff_snapshots,
    directory_matches_archive, snapshot_archive, snapshot_directory,
};
pub use walk::{TraversalOptions, WalkSignal, list_files, walk, walk_filtered};
