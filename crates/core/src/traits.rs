//! Behavioral traits shared across fsguard crates
//!
//! Only seams that need a test double are abstracted here; everything else
//! is a concrete type.

/// Decides whether a relative path is excluded from a walk or snapshot
///
/// Paths are forward-slash relative paths (see [`crate::path`]). The default
/// implementation is the glob-based `PatternMatcher` in `fsguard-config`;
/// tests can supply closures or fixed sets instead.
///
/// # Examples
///
/// ```
/// use fsguard_core::PathFilter;
///
/// struct SkipTarget;
///
/// impl PathFilter for SkipTarget {
///     fn should_exclude(&self, path: &str) -> bool {
///         path == "target" || path.starts_with("target/")
///     }
/// }
///
/// assert!(SkipTarget.should_exclude("target/debug"));
/// assert!(!SkipTarget.should_exclude("src/lib.rs"));
/// ```
pub trait PathFilter {
    /// Return `true` if `path` must be skipped
    fn should_exclude(&self, path: &str) -> bool;
}

impl<F> PathFilter for F
where
    F: Fn(&str) -> bool,
{
    fn should_exclude(&self, path: &str) -> bool {
        self(path)
    }
}

/// Filter that never excludes anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;

impl PathFilter for NoFilter {
    fn should_exclude(&self, _path: &str) -> bool {
        false
    }
}
