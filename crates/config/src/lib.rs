//! Configuration for fsguard
//!
//! This crate handles:
//! - Configuration loading (`.fsguard.toml`)
//! - Platform-aware exclusion lists
//! - The exclusion pattern matcher used by traversal and snapshotting
//! - Logging initialization

pub mod config;
pub mod excludes;
pub mod logging;
pub mod matcher;

// Re-export error types from core
pub use fsguard_core::{Error, Result};

// Re-export main types
pub use config::{CONFIG_FILE_NAME, Config, WalkConfig};
pub use excludes::ExcludesConfig;
pub use matcher::{PatternMatcher, should_exclude};
