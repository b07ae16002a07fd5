//! fsguard CLI library
//!
//! This library contains all the CLI logic for fsguard, making it reusable
//! for testing and integration with other tools.

pub mod cmd;
pub mod command;
pub mod common;
pub mod error;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fsguard_config::Config;
use std::path::PathBuf;
use tracing::debug;

use command::Command;
use common::RuntimeContext;

/// fsguard - transactional file operations
#[derive(Debug, Parser)]
#[command(name = "fsguard")]
#[command(about = "Walk, snapshot, verify and atomically write files")]
#[command(version)]
#[command(long_about = "Walk, snapshot, verify and atomically write files

Every write goes through a temporary file that is renamed over the target,
so readers see either the old content or the new content, never a mix.
Temporary artifacts are tracked and removed when a command finishes.

Exclusion patterns can be set in .fsguard.toml in the working directory
or passed with --exclude on the commands that walk a tree.")]
pub struct Cli {
    /// Path to the config file (default: ./.fsguard.toml if present)
    #[arg(long, env = "FSGUARD_CONFIG", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Show what would change without touching the filesystem
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Enable verbose output (shows DEBUG level logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to a file (useful for debugging)
    #[arg(long, env = "FSGUARD_LOG_FILE", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the fsguard CLI
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List files under a directory
    Ls(cmd::ls::LsCommand),

    /// Check that a directory holds exactly the files of a zip archive
    #[command(long_about = "Check that a directory holds exactly the files of a zip archive

Files are compared by relative path and SHA-256 of their content.
Modification times and directory entries are ignored.

Examples:
  • fsguard verify site site.zip
      → Compare everything under ./site

  • fsguard verify site site.zip --exclude .git/
      → Ignore the .git directory on the filesystem side")]
    Verify(cmd::verify::VerifyCommand),

    /// Atomically replace a file with data from stdin or another file
    Write(cmd::write::WriteCommand),

    /// Atomically copy a file, preserving its permissions
    Copy(cmd::copy::CopyCommand),

    /// Print the hash-annotated records of a directory
    Snapshot(cmd::snapshot::SnapshotCommand),
}

/// Load the explicit config file, or `.fsguard.toml` from the working directory
fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            anyhow::ensure!(path.is_file(), "Config file not found: {}", path.display());
            Config::load(path)?
        }
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            Config::load_from_dir(&cwd)?
        }
    };
    Ok(config)
}

/// Execute the command based on the command type
fn execute_command(command: &Commands, context: &RuntimeContext) -> Result<()> {
    match command {
        Commands::Ls(ls_cmd) => ls_cmd.execute(context)?,
        Commands::Verify(verify_cmd) => verify_cmd.execute(context)?,
        Commands::Write(write_cmd) => write_cmd.execute(context)?,
        Commands::Copy(copy_cmd) => {
            copy_cmd.execute(context)?;
        }
        Commands::Snapshot(snapshot_cmd) => {
            snapshot_cmd.execute(context)?;
        }
    }

    Ok(())
}

/// Main entry point for the CLI logic
///
/// Resources registered while the command runs are released before this
/// returns, whether the command succeeded or not.
///
/// # Errors
///
/// Returns an error if:
/// - Logging initialization fails
/// - Configuration loading fails
/// - Command execution fails
/// - Releasing the command's temporary resources fails
pub fn run(cli: Cli) -> Result<()> {
    fsguard_config::logging::init(cli.verbose, cli.log_file.as_deref())?;

    let config = load_config(cli.config.as_deref())?;
    let context = RuntimeContext::new(config, cli.dry_run);
    debug!(dry_run = context.dry_run, "Runtime context ready");

    // Releases resources if the command unwinds
    let mut guard = context.resources.guard();
    let result = execute_command(&cli.command, &context);
    guard.defuse();
    drop(guard);

    let cleanup = context.resources.cleanup_with_panic_isolation();

    match (result, cleanup) {
        (Err(e), Err(cleanup_error)) => {
            tracing::warn!("Cleanup after failed command also failed: {cleanup_error}");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), cleanup) => cleanup.context("Failed to release temporary resources"),
    }
}
