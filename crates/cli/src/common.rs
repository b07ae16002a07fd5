//! Common utilities and types shared across CLI commands

use fsguard_config::Config;
use fsguard_engine::{ResourceManager, TraversalOptions};
use std::sync::Arc;

/// Runtime context for CLI commands
///
/// Consolidates what every command needs: the configuration, the global
/// dry-run flag and a resource manager scoped to this invocation.
///
/// # Examples
///
/// ```
/// use fsguard::common::RuntimeContext;
/// use fsguard_config::Config;
///
/// let context = RuntimeContext::new(Config::default(), true);
/// assert!(context.dry_run);
/// assert_eq!(context.resources.count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    /// Shared configuration (uses Arc to avoid cloning)
    pub config: Arc<Config>,
    /// Report what would change instead of changing it
    pub dry_run: bool,
    /// Resources acquired while the command runs
    pub resources: ResourceManager,
}

impl RuntimeContext {
    /// Create a context with a fresh resource manager
    pub fn new(config: Config, dry_run: bool) -> Self {
        Self {
            config: Arc::new(config),
            dry_run,
            resources: ResourceManager::new(),
        }
    }

    /// Configured exclusion patterns followed by `extra`
    pub fn exclude_patterns(&self, extra: &[String]) -> Vec<String> {
        let mut patterns = self.config.exclude_patterns();
        patterns.extend_from_slice(extra);
        patterns
    }

    /// Traversal options from the configuration, with `extra` exclusions added
    pub fn traversal_options(&self, extra: &[String]) -> TraversalOptions {
        TraversalOptions {
            exclude_patterns: self.exclude_patterns(extra),
            ..TraversalOptions::from_config(&self.config)
        }
    }
}
