//! Snapshot command implementation
//!
//! Print the hash-annotated records of a directory.

use anyhow::Context;
use clap::Args;
use fsguard_engine::{DirectorySnapshot, snapshot_directory};
use owo_colors::OwoColorize;
use std::path::PathBuf;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;

/// Width of the hash prefix shown in text output
const SHORT_HASH_LEN: usize = 12;

/// Snapshot command
#[derive(Debug, Args)]
pub struct SnapshotCommand {
    /// Directory to snapshot
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Extra exclusion pattern (repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,

    /// Print records as JSON
    #[arg(long)]
    pub json: bool,
}

impl Command for SnapshotCommand {
    type Output = DirectorySnapshot;

    fn execute(&self, context: &RuntimeContext) -> Result<DirectorySnapshot> {
        let snapshot = snapshot_directory(&self.dir, &context.exclude_patterns(&self.excludes))?;

        if self.json {
            let json = serde_json::to_string_pretty(&snapshot)
                .context("Failed to serialize snapshot")?;
            println!("{json}");
        } else {
            for line in render_text(&snapshot) {
                println!("{line}");
            }
        }

        Ok(snapshot)
    }
}

/// One line per record: short hash, size and path (directories end in `/`)
fn render_text(snapshot: &DirectorySnapshot) -> Vec<String> {
    snapshot
        .iter()
        .map(|record| {
            let hash = record
                .content_hash
                .as_deref()
                .map_or("-", |h| &h[..SHORT_HASH_LEN.min(h.len())]);
            if record.is_directory {
                format!(
                    "{hash:<width$}  {:>10}  {}",
                    "",
                    format!("{}/", record.relative_path).blue(),
                    width = SHORT_HASH_LEN
                )
            } else {
                format!(
                    "{hash:<width$}  {:>10}  {}",
                    record.size,
                    record.relative_path,
                    width = SHORT_HASH_LEN
                )
            }
        })
        .collect()
}
