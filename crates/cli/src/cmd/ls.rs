//! Ls command implementation
//!
//! List the files below a directory, honoring the configured traversal policy.

use clap::Args;
use fsguard_core::path::relative_slash;
use fsguard_engine::{TraversalOptions, WalkSignal, list_files, walk};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;

/// Ls command
#[derive(Debug, Args)]
pub struct LsCommand {
    /// Directory to list
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Extra exclusion pattern (repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,
}

impl Command for LsCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        for file in self.collect(context)? {
            println!("{file}");
        }
        Ok(())
    }
}

impl LsCommand {
    /// Relative paths of the listed files, sorted
    pub fn collect(&self, context: &RuntimeContext) -> Result<Vec<String>> {
        let mut options = context.traversal_options(&self.excludes);
        if !self.recursive {
            options.max_depth = Some(0);
        }

        let files = if is_unfiltered(&options) {
            list_files(&self.dir, options.max_depth.is_none())?
        } else {
            debug!(?options, "Listing with traversal policy");
            filtered_files(&self.dir, &options)?
        };

        let mut relative = files
            .iter()
            .map(|path| relative_slash(path, &self.dir))
            .collect::<fsguard_core::Result<Vec<_>>>()?;
        relative.sort();
        Ok(relative)
    }
}

/// Whether the plain listing gives the same result as a policy walk
fn is_unfiltered(options: &TraversalOptions) -> bool {
    options.exclude_patterns.is_empty()
        && !options.ignore_hidden
        && !options.follow_symlinks
        && matches!(options.max_depth, None | Some(0))
}

fn filtered_files(dir: &Path, options: &TraversalOptions) -> fsguard_core::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(dir, options, |path, metadata, error| {
        if let Some(error) = error {
            return Err(error);
        }
        if metadata.is_some_and(|m| !m.is_dir()) {
            files.push(path.to_path_buf());
        }
        Ok(WalkSignal::Continue)
    })?;
    Ok(files)
}
