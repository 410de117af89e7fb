//! Branch name selection by glob pattern.

use gitvitals_core::VitalsError;
use glob::Pattern;

/// Long-lived integration branches that are never treated as units of work.
pub const INTEGRATION_BRANCHES: [&str; 3] = ["main", "master", "develop"];

/// Selects work branches by glob pattern.
///
/// `*` matches across `/`, so `feature/*` also selects
/// `feature/auth/login`. Integration branches never match, whatever the
/// patterns say.
///
/// # Examples
///
/// ```
/// use gitvitals_history::BranchFilter;
///
/// let filter = BranchFilter::new(&["feature/*", "hotfix/*"]).unwrap();
/// assert!(filter.matches("feature/login"));
/// assert!(!filter.matches("release/1.2"));
/// assert!(!BranchFilter::new(&["*"]).unwrap().matches("main"));
/// ```
#[derive(Debug, Clone)]
pub struct BranchFilter {
    raw: Vec<String>,
    compiled: Vec<Pattern>,
}

impl BranchFilter {
    /// Compile a filter from glob patterns.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::InvalidOption`] if a pattern is not a valid glob.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, VitalsError> {
        let mut raw = Vec::with_capacity(patterns.len());
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            let glob = Pattern::new(pattern).map_err(|e| {
                VitalsError::invalid_option(
                    "branch_patterns",
                    format!("invalid glob '{pattern}': {e}"),
                )
            })?;
            raw.push(pattern.to_string());
            compiled.push(glob);
        }
        Ok(Self { raw, compiled })
    }

    /// Whether `name` is a work branch selected by this filter.
    pub fn matches(&self, name: &str) -> bool {
        if INTEGRATION_BRANCHES.contains(&name) {
            return false;
        }
        self.compiled.iter().any(|p| p.matches(name))
    }

    /// The patterns this filter was built from.
    pub fn patterns(&self) -> &[String] {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_patterns_select_work_branches() {
        let filter = BranchFilter::new(&gitvitals_core::default_branch_patterns()).unwrap();
        assert!(filter.matches("feature/login"));
        assert!(filter.matches("bugfix/null-check"));
        assert!(filter.matches("hotfix/2024-05-01"));
        assert!(!filter.matches("release/1.0"));
        assert!(!filter.matches("featurex"));
    }

    #[test]
    fn star_crosses_path_separators() {
        let filter = BranchFilter::new(&["feature/*"]).unwrap();
        assert!(filter.matches("feature/auth/login"));
    }

    #[test]
    fn integration_branches_never_match() {
        let filter = BranchFilter::new(&["*"]).unwrap();
        for name in INTEGRATION_BRANCHES {
            assert!(!filter.matches(name), "{name} should be excluded");
        }
        assert!(filter.matches("spike"));
    }

    #[test]
    fn invalid_glob_is_an_option_error() {
        let err = BranchFilter::new(&["feature/[abc"]).unwrap_err();
        assert!(matches!(err, VitalsError::InvalidOption { .. }));
    }

    #[test]
    fn patterns_are_trimmed_and_kept() {
        let filter = BranchFilter::new(&[" feature/* "]).unwrap();
        assert_eq!(filter.patterns(), &["feature/*".to_string()]);
        assert!(filter.matches("feature/a"));
    }
}
