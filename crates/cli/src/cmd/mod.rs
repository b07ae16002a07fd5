//! CLI command implementations
//!
//! This module contains all command implementations for the fsguard CLI.

pub mod copy;
pub mod ls;
pub mod snapshot;
pub mod verify;
pub mod write;
