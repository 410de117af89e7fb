use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VitalsError;
use crate::options::MetricsConfig;

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = ".gitvitals.toml";

/// Top-level configuration loaded from `.gitvitals.toml`.
///
/// Supports layered resolution: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use gitvitals_core::VitalsConfig;
///
/// let config = VitalsConfig::default();
/// assert_eq!(config.history.max_files_per_commit, 25);
/// assert_eq!(config.metrics.velocity_trend.weeks_lookback, 12);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitalsConfig {
    /// How history is read from the repository.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Per-analyzer options.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl VitalsConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::Io`] if the file cannot be read,
    /// [`VitalsError::FileNotFound`] if `path` does not exist,
    /// [`VitalsError::Toml`] if the content is not valid TOML, or
    /// [`VitalsError::InvalidOption`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gitvitals_core::VitalsConfig;
    /// use std::path::Path;
    ///
    /// let config = VitalsConfig::from_file(Path::new(".gitvitals.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, VitalsError> {
        if !path.exists() {
            return Err(VitalsError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::Toml`] if parsing fails or
    /// [`VitalsError::InvalidOption`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitvitals_core::VitalsConfig;
    ///
    /// let toml = r#"
    /// [metrics.bus_factor]
    /// knowledge_threshold = 0.5
    /// "#;
    /// let config = VitalsConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.metrics.bus_factor.knowledge_threshold, 0.5);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, VitalsError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section against its documented domain.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::InvalidOption`] for the first violation.
    pub fn validate(&self) -> Result<(), VitalsError> {
        self.history.validate()?;
        self.metrics.validate()
    }
}

/// How commit and branch history is mined from a git repository.
///
/// # Examples
///
/// ```
/// use gitvitals_core::HistoryConfig;
///
/// let config = HistoryConfig::default();
/// assert_eq!(config.max_files_per_commit, 25);
/// assert!(config.main_branch.is_none());
/// assert!(!config.include_remote_branches);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Skip commits touching more files than this (default: 25).
    #[serde(default = "default_max_files_per_commit")]
    pub max_files_per_commit: usize,
    /// Integration branch merges are read from (default: `main`, then `master`).
    pub main_branch: Option<String>,
    /// Also consider `refs/remotes/*` when looking for open branches (default: false).
    #[serde(default)]
    pub include_remote_branches: bool,
}

fn default_max_files_per_commit() -> usize {
    25
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_files_per_commit: default_max_files_per_commit(),
            main_branch: None,
            include_remote_branches: false,
        }
    }
}

impl HistoryConfig {
    fn validate(&self) -> Result<(), VitalsError> {
        if self.max_files_per_commit == 0 {
            return Err(VitalsError::invalid_option(
                "history.max_files_per_commit",
                "must be > 0",
            ));
        }
        if let Some(branch) = &self.main_branch {
            if branch.trim().is_empty() {
                return Err(VitalsError::invalid_option(
                    "history.main_branch",
                    "must not be blank",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = VitalsConfig::default();
        assert_eq!(config.history.max_files_per_commit, 25);
        assert!(config.history.main_branch.is_none());
        assert_eq!(config.metrics.bus_factor.lookback_months, 6);
        assert_eq!(config.metrics.bus_factor.decay_half_life_days, 90.0);
        assert_eq!(config.metrics.single_point_of_failure.dominance_threshold, 0.8);
        assert_eq!(config.metrics.velocity_trend.min_t_statistic, 2.0);
        assert!(config.metrics.branch_lifecycle.include_open);
    }

    #[test]
    fn missing_config_file_is_reported_by_path() {
        let path = Path::new("/nonexistent/gitvitals/.gitvitals.toml");
        let err = VitalsConfig::from_file(path).unwrap_err();
        assert!(matches!(&err, VitalsError::FileNotFound(p) if p == path));
    }

    #[test]
    fn out_of_range_lookback_is_rejected() {
        let toml = r#"
[metrics.bus_factor]
lookback_months = 10000000
"#;
        let err = VitalsConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("bus_factor.lookback_months"));
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[history]
max_files_per_commit = 50
main_branch = "trunk"
"#;
        let config = VitalsConfig::from_toml(toml).unwrap();
        assert_eq!(config.history.max_files_per_commit, 50);
        assert_eq!(config.history.main_branch.as_deref(), Some("trunk"));
    }

    #[test]
    fn parse_full_metrics_toml() {
        let toml = r#"
[metrics.bus_factor]
lookback_months = 12
knowledge_threshold = 0.5
decay_half_life_days = 30.0

[metrics.critical_files]
critical_percentile = 0.95
high_percentile = 0.75
medium_percentile = 0.5

[metrics.single_point_of_failure]
dominance_threshold = 0.9
max_contributors = 1

[metrics.flow_efficiency]
branch_patterns = ["feat/*"]

[metrics.velocity_trend]
weeks_lookback = 26
"#;
        let config = VitalsConfig::from_toml(toml).unwrap();
        assert_eq!(config.metrics.bus_factor.lookback_months, 12);
        assert_eq!(config.metrics.bus_factor.decay_half_life_days, 30.0);
        assert_eq!(config.metrics.critical_files.critical_percentile, 0.95);
        assert_eq!(config.metrics.single_point_of_failure.max_contributors, 1);
        assert_eq!(
            config.metrics.flow_efficiency.branch_patterns,
            vec!["feat/*"]
        );
        assert_eq!(config.metrics.velocity_trend.weeks_lookback, 26);
        // untouched sections keep defaults
        assert_eq!(
            config.metrics.cycle_time.branch_patterns,
            vec!["feature/*", "bugfix/*", "hotfix/*"]
        );
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = VitalsConfig::from_toml("").unwrap();
        assert_eq!(config.history.max_files_per_commit, 25);
        assert_eq!(config.metrics, MetricsConfig::default());
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = VitalsConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(VitalsError::Toml(_))));
    }

    #[test]
    fn out_of_range_values_are_rejected_on_load() {
        let toml = r#"
[metrics.bus_factor]
knowledge_threshold = 0.0
"#;
        let result = VitalsConfig::from_toml(toml);
        assert!(matches!(result, Err(VitalsError::InvalidOption { .. })));

        let toml = r#"
[history]
max_files_per_commit = 0
"#;
        assert!(VitalsConfig::from_toml(toml).is_err());
    }
}
