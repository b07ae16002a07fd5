//! Exclusion pattern matcher
//!
//! Classifies a forward-slash relative path as excluded or included. A path is
//! excluded when ANY pattern matches; there is no negation.
//!
//! Pattern forms, checked in this order:
//!
//! 1. **Directory** (`build/`, `.git/`): matches the directory at any depth and
//!    everything beneath it. Tried as `p`, `p**`, `**/p`, `**/p**`, plus the
//!    bare name (`build`, `**/build`) so the directory entry itself is caught.
//! 2. **Glob** (contains `*`): with `**` the pattern is matched directly with
//!    globstar semantics. Without it, a single-segment pattern (`*.log`) is
//!    tried as-is and as `**/*.log`; a multi-segment pattern (`src/*.rs`) is
//!    only tried against paths with the same number of segments.
//! 3. **Literal**: exact string equality.
//!
//! `*` never crosses a `/`; `**` does. Matching is case-sensitive. A malformed
//! glob never matches and never produces an error.
//!
//! Example:
//! ```
//! use fsguard_config::PatternMatcher;
//!
//! let matcher = PatternMatcher::new([".git/", "*.log", "docs/*.md"]);
//!
//! assert!(matcher.is_excluded("vendor/lib/.git/config"));
//! assert!(matcher.is_excluded("logs/today.log"));
//! assert!(matcher.is_excluded("docs/intro.md"));
//! assert!(!matcher.is_excluded("site/docs/intro.md"));
//! assert!(!matcher.is_excluded("src/main.rs"));
//! ```

use fsguard_core::PathFilter;
use fsguard_core::path::{normalize_slashes, segment_count};
use glob::{MatchOptions, Pattern};
use tracing::debug;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A pattern compiled into the glob expansions it is tried against
#[derive(Debug, Clone)]
enum CompiledPattern {
    /// Directory pattern: any expansion matching excludes the path
    Directory(Vec<Pattern>),
    /// Glob containing `**`, or a single-segment glob with its `**/` variant
    AnyOf(Vec<Pattern>),
    /// Multi-segment glob without `**`, only tried on equal segment counts
    Fixed { pattern: Pattern, segments: usize },
    /// Exact string
    Literal(String),
}

impl CompiledPattern {
    fn compile(raw: &str) -> Option<Self> {
        if raw.ends_with('/') {
            let name = raw.trim_end_matches('/');
            let mut expansions = vec![
                raw.to_string(),
                format!("{raw}**"),
                format!("**/{raw}"),
                format!("**/{raw}**"),
            ];
            if !name.is_empty() {
                expansions.push(name.to_string());
                expansions.push(format!("**/{name}"));
            }
            let compiled = compile_all(raw, &expansions);
            return (!compiled.is_empty()).then_some(CompiledPattern::Directory(compiled));
        }

        if raw.contains('*') {
            if raw.contains("**") {
                let compiled = compile_all(raw, &[raw.to_string()]);
                return (!compiled.is_empty()).then_some(CompiledPattern::AnyOf(compiled));
            }

            let segments = segment_count(raw);
            if segments <= 1 {
                let compiled = compile_all(raw, &[raw.to_string(), format!("**/{raw}")]);
                return (!compiled.is_empty()).then_some(CompiledPattern::AnyOf(compiled));
            }

            return compile_one(raw, raw).map(|pattern| CompiledPattern::Fixed { pattern, segments });
        }

        Some(CompiledPattern::Literal(raw.to_string()))
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            CompiledPattern::Directory(patterns) | CompiledPattern::AnyOf(patterns) => patterns
                .iter()
                .any(|p| p.matches_with(path, MATCH_OPTIONS)),
            CompiledPattern::Fixed { pattern, segments } => {
                segment_count(path) == *segments && pattern.matches_with(path, MATCH_OPTIONS)
            }
            CompiledPattern::Literal(literal) => literal == path,
        }
    }
}

fn compile_one(raw: &str, expansion: &str) -> Option<Pattern> {
    match Pattern::new(expansion) {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            debug!(pattern = raw, expansion, error = %e, "Ignoring malformed exclusion glob");
            None
        }
    }
}

fn compile_all(raw: &str, expansions: &[String]) -> Vec<Pattern> {
    expansions
        .iter()
        .filter_map(|expansion| compile_one(raw, expansion))
        .collect()
}

/// Pre-compiled set of exclusion patterns
///
/// Compile once and reuse for a whole walk; [`should_exclude`] is the
/// one-shot form.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    patterns: Vec<CompiledPattern>,
}

impl PatternMatcher {
    /// Compile a list of exclusion patterns
    ///
    /// Malformed globs are dropped (they could never match).
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| CompiledPattern::compile(p.as_ref()))
            .collect();
        Self { patterns }
    }

    /// Whether no pattern survived compilation
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check if a relative path is excluded
    ///
    /// The path is normalized to forward slashes first.
    pub fn is_excluded(&self, path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let normalized = normalize_slashes(path);
        self.patterns.iter().any(|p| p.matches(&normalized))
    }
}

impl PathFilter for PatternMatcher {
    fn should_exclude(&self, path: &str) -> bool {
        self.is_excluded(path)
    }
}

/// Check a path against a list of patterns without keeping a matcher around
///
/// # Examples
///
/// ```
/// use fsguard_config::should_exclude;
///
/// assert!(should_exclude("a/node_modules/x.js", &["node_modules/"]));
/// assert!(!should_exclude("src/x.js", &["node_modules/"]));
/// assert!(!should_exclude("anything", &[] as &[&str]));
/// ```
pub fn should_exclude<S: AsRef<str>>(path: &str, patterns: &[S]) -> bool {
    PatternMatcher::new(patterns).is_excluded(path)
}
