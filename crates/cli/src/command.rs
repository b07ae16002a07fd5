//! The `Command` seam every subcommand implements
//!
//! Subcommands are clap `Args` structs; dispatch in `lib.rs` hands each one
//! the invocation's [`RuntimeContext`].

use crate::common::RuntimeContext;
use crate::error::Result;

/// A subcommand that can run against a [`RuntimeContext`]
///
/// Implementations must honor `context.dry_run` by reporting instead of
/// mutating, and register any temp artifact they create with
/// `context.resources` so a failed run leaves nothing behind.
///
/// `Output` lets tests inspect what a command produced (`ls` returns `()`,
/// `snapshot` returns the [`DirectorySnapshot`](fsguard_engine::DirectorySnapshot)
/// it printed).
///
/// # Example
///
/// ```
/// use fsguard::command::Command;
/// use fsguard::common::RuntimeContext;
/// use fsguard::error::Result;
/// use fsguard_config::Config;
///
/// /// Count the tracked temp resources
/// struct Pending;
///
/// impl Command for Pending {
///     type Output = usize;
///
///     fn execute(&self, context: &RuntimeContext) -> Result<usize> {
///         Ok(context.resources.count())
///     }
/// }
///
/// let context = RuntimeContext::new(Config::default(), true);
/// context.resources.add_temp_file("/tmp/fsguard-pending");
/// assert_eq!(Pending.execute(&context).unwrap(), 1);
/// ```
pub trait Command {
    /// What the command hands back after printing
    type Output;

    /// Run the command
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`](crate::error::CommandError) describing the
    /// failed operation and the path involved.
    fn execute(&self, context: &RuntimeContext) -> Result<Self::Output>;
}
