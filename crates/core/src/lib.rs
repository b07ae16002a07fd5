//! Core types and utilities for fsguard
//!
//! This is the foundation crate that all other fsguard crates depend on.
//! It provides:
//! - The shared error taxonomy
//! - Forward-slash relative path helpers
//! - Path safety and accessibility validation
//! - Platform detection
//! - The `PathFilter` seam used by traversal and snapshotting
//!
//! This crate has no dependencies on other fsguard crates.

pub mod error;
pub mod path;
pub mod platform;
pub mod traits;
pub mod validate;

pub use error::{BoxError, Error, Result};
pub use traits::{NoFilter, PathFilter};
