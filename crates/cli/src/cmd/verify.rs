//! Verify command implementation
//!
//! Check that a directory holds exactly the files stored in a zip archive.

use clap::Args;
use fsguard_engine::{
    SnapshotDifference, diff_snapshots, directory_matches_archive, snapshot_archive,
    snapshot_directory,
};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tracing::info;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};

/// Verify command
#[derive(Debug, Args)]
pub struct VerifyCommand {
    /// Directory to verify
    pub dir: PathBuf,

    /// Zip archive the directory should match
    pub archive: PathBuf,

    /// Extra exclusion pattern applied to the directory (repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,
}

impl Command for VerifyCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let differences = self.differences(context)?;

        if differences.is_empty() {
            println!(
                "{} {} matches {}",
                "✓".green(),
                self.dir.display(),
                self.archive.display()
            );
            return Ok(());
        }

        for difference in &differences {
            match difference {
                SnapshotDifference::Added(_) => println!("{}", difference.green()),
                SnapshotDifference::Removed(_) => println!("{}", difference.red()),
                SnapshotDifference::Modified(_) => println!("{}", difference.yellow()),
            }
        }

        Err(CommandError::VerificationFailed {
            dir: self.dir.clone(),
            archive: self.archive.clone(),
            count: differences.len(),
        })
    }
}

impl VerifyCommand {
    /// Differences going from the archive to the directory; empty on a match
    pub fn differences(&self, context: &RuntimeContext) -> Result<Vec<SnapshotDifference>> {
        let patterns = context.exclude_patterns(&self.excludes);

        if directory_matches_archive(&self.dir, &self.archive, &patterns)? {
            info!(dir = %self.dir.display(), archive = %self.archive.display(), "Directory matches archive");
            return Ok(Vec::new());
        }

        // Only pay for the second pass when there is something to report
        let live = snapshot_directory(&self.dir, &patterns)?.files_only();
        let archived = snapshot_archive(&self.archive)?;
        Ok(diff_snapshots(&archived, &live))
    }
}
