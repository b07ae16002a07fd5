//! Write command implementation
//!
//! Atomically replace a file with data from another file or standard input.

use anyhow::Context;
use clap::Args;
use fsguard_engine::{AtomicWriter, atomic_write_file};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::debug;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};

/// Write command
#[derive(Debug, Args)]
pub struct WriteCommand {
    /// File to replace
    pub target: PathBuf,

    /// Read content from this file instead of standard input
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Permission bits for the new file, in octal (e.g. 644)
    #[arg(short, long, value_name = "OCTAL", value_parser = parse_mode)]
    pub mode: Option<u32>,
}

impl Command for WriteCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        match &self.input {
            Some(input) => {
                let bytes = fs::read(input)
                    .with_context(|| format!("Failed to read input {}", input.display()))?;
                self.write_bytes(context, &bytes)
            }
            None => self.write_stream(context, &mut io::stdin().lock()),
        }
    }
}

impl WriteCommand {
    /// Write an in-memory buffer
    pub fn write_bytes(&self, context: &RuntimeContext, bytes: &[u8]) -> Result<()> {
        if context.dry_run {
            println!("Would write {} bytes to {}", bytes.len(), self.target.display());
            return Ok(());
        }

        atomic_write_file(&self.target, bytes, self.mode)?;
        println!("Wrote {} bytes to {}", bytes.len(), self.target.display());
        Ok(())
    }

    /// Stream a reader into the target without buffering it in memory
    ///
    /// The temp file is tracked by the command's resource manager until the
    /// write resolves.
    pub fn write_stream(&self, context: &RuntimeContext, reader: &mut dyn Read) -> Result<()> {
        if context.dry_run {
            let size = io::copy(reader, &mut io::sink())?;
            println!("Would write {size} bytes to {}", self.target.display());
            return Ok(());
        }

        let mut writer = AtomicWriter::open_tracked(&self.target, &context.resources)?;
        let size = io::copy(reader, &mut writer)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = self.mode {
                writer.set_permissions(fs::Permissions::from_mode(mode))?;
            }
        }

        writer.commit()?;
        debug!(target = %self.target.display(), bytes = size, "Streamed write committed");
        println!("Wrote {size} bytes to {}", self.target.display());
        Ok(())
    }
}

/// Parse an octal permission such as `644` or `0o755`
pub fn parse_mode(text: &str) -> Result<u32> {
    let digits = text.strip_prefix("0o").unwrap_or(text);
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= 0o7777 => Ok(mode),
        _ => Err(CommandError::InvalidMode(text.to_string())),
    }
}
