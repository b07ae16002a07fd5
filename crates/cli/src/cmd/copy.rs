//! Copy command implementation
//!
//! Atomically replace a file with a copy of another one.

use clap::Args;
use fsguard_engine::atomic_copy;
use std::path::PathBuf;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;

/// Copy command
#[derive(Debug, Args)]
pub struct CopyCommand {
    /// File to copy
    pub src: PathBuf,

    /// Destination; replaced atomically if it exists
    pub dst: PathBuf,
}

impl Command for CopyCommand {
    type Output = Option<u64>;

    /// Returns the number of bytes copied, or `None` on a dry run
    fn execute(&self, context: &RuntimeContext) -> Result<Option<u64>> {
        if context.dry_run {
            println!("Would copy {} to {}", self.src.display(), self.dst.display());
            return Ok(None);
        }

        let copied = atomic_copy(&self.src, &self.dst)?;
        println!(
            "Copied {copied} bytes from {} to {}",
            self.src.display(),
            self.dst.display()
        );
        Ok(Some(copied))
    }
}
