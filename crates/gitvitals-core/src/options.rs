//! Typed, range-validated options for each analyzer.
//!
//! Every option has a documented default and a documented domain. Values
//! outside the domain are rejected by `validate` with
//! [`VitalsError::InvalidOption`] before any history is read.

use serde::{Deserialize, Serialize};

use crate::error::VitalsError;

/// Largest accepted `lookback_months` (100 years).
pub const MAX_LOOKBACK_MONTHS: u32 = 1200;

/// Largest accepted `velocity_trend.weeks_lookback` (100 years).
pub const MAX_WEEKS_LOOKBACK: u32 = 5200;

/// Options for every analyzer, one section per metric.
///
/// # Examples
///
/// ```
/// use gitvitals_core::MetricsConfig;
///
/// let config = MetricsConfig::default();
/// assert_eq!(config.bus_factor.knowledge_threshold, 0.8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Bus factor options.
    #[serde(default)]
    pub bus_factor: BusFactorOptions,
    /// Knowledge distribution (Gini) options.
    #[serde(default)]
    pub knowledge_distribution: KnowledgeDistributionOptions,
    /// Critical file options.
    #[serde(default)]
    pub critical_files: CriticalFileOptions,
    /// Single-point-of-failure options.
    #[serde(default)]
    pub single_point_of_failure: SinglePointOfFailureOptions,
    /// Flow efficiency options.
    #[serde(default)]
    pub flow_efficiency: FlowEfficiencyOptions,
    /// Branch lifecycle options.
    #[serde(default)]
    pub branch_lifecycle: BranchLifecycleOptions,
    /// Velocity trend options.
    #[serde(default)]
    pub velocity_trend: VelocityTrendOptions,
    /// Cycle time options.
    #[serde(default)]
    pub cycle_time: CycleTimeOptions,
}

impl MetricsConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`VitalsError::InvalidOption`] found.
    pub fn validate(&self) -> Result<(), VitalsError> {
        self.bus_factor.validate()?;
        self.knowledge_distribution.validate()?;
        self.critical_files.validate()?;
        self.single_point_of_failure.validate()?;
        self.flow_efficiency.validate()?;
        self.branch_lifecycle.validate()?;
        self.velocity_trend.validate()?;
        self.cycle_time.validate()
    }

    /// Override the lookback window of every history-window analyzer.
    pub fn set_lookback_months(&mut self, months: u32) {
        self.bus_factor.lookback_months = months;
        self.knowledge_distribution.lookback_months = months;
        self.critical_files.lookback_months = months;
        self.single_point_of_failure.lookback_months = months;
        self.cycle_time.lookback_months = months;
    }

    /// Override the branch patterns of every branch-based analyzer.
    pub fn set_branch_patterns(&mut self, patterns: Vec<String>) {
        self.flow_efficiency.branch_patterns = patterns.clone();
        self.branch_lifecycle.branch_patterns = patterns.clone();
        self.cycle_time.branch_patterns = patterns;
    }
}

/// Options for the bus factor analyzer.
///
/// # Examples
///
/// ```
/// use gitvitals_core::BusFactorOptions;
///
/// let opts = BusFactorOptions { knowledge_threshold: 1.5, ..Default::default() };
/// assert!(opts.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusFactorOptions {
    /// History window in months of 30 days (default: 6, in `1..=1200`).
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
    /// Fraction of total knowledge the covering set must hold (default: 0.8, in `(0, 1]`).
    #[serde(default = "default_knowledge_threshold")]
    pub knowledge_threshold: f64,
    /// Age in days at which a contribution's weight halves (default: 90, must be > 0).
    #[serde(default = "default_half_life_days")]
    pub decay_half_life_days: f64,
}

impl Default for BusFactorOptions {
    fn default() -> Self {
        Self {
            lookback_months: default_lookback_months(),
            knowledge_threshold: default_knowledge_threshold(),
            decay_half_life_days: default_half_life_days(),
        }
    }
}

impl BusFactorOptions {
    /// Check every option against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::InvalidOption`] for the first violation.
    pub fn validate(&self) -> Result<(), VitalsError> {
        require_months("bus_factor.lookback_months", self.lookback_months)?;
        require_fraction(
            "bus_factor.knowledge_threshold",
            self.knowledge_threshold,
        )?;
        require_positive("bus_factor.decay_half_life_days", self.decay_half_life_days)
    }
}

/// Options for the knowledge distribution analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDistributionOptions {
    /// History window in months of 30 days (default: 6, in `1..=1200`).
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
    /// Recency half-life in days (default: 90).
    #[serde(default = "default_half_life_days")]
    pub decay_half_life_days: f64,
}

impl Default for KnowledgeDistributionOptions {
    fn default() -> Self {
        Self {
            lookback_months: default_lookback_months(),
            decay_half_life_days: default_half_life_days(),
        }
    }
}

impl KnowledgeDistributionOptions {
    /// Check every option against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::InvalidOption`] for the first violation.
    pub fn validate(&self) -> Result<(), VitalsError> {
        require_months(
            "knowledge_distribution.lookback_months",
            self.lookback_months,
        )?;
        require_positive(
            "knowledge_distribution.decay_half_life_days",
            self.decay_half_life_days,
        )
    }
}

/// Options for the critical file analyzer.
///
/// The three cut lines are percentile ranks in `[0, 1]`: a file whose
/// risk score beats at least `critical_percentile` of the population is
/// critical, and so on down. They must be ordered
/// `critical >= high >= medium`.
///
/// # Examples
///
/// ```
/// use gitvitals_core::CriticalFileOptions;
///
/// let opts = CriticalFileOptions::default();
/// assert_eq!(opts.critical_percentile, 0.9);
/// assert_eq!(opts.high_percentile, 0.65);
/// assert_eq!(opts.medium_percentile, 0.4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalFileOptions {
    /// History window in months of 30 days (default: 6, in `1..=1200`).
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
    /// Percentile rank at or above which a file is CRITICAL (default: 0.9, the top decile).
    #[serde(default = "default_critical_percentile")]
    pub critical_percentile: f64,
    /// Percentile rank at or above which a file is HIGH (default: 0.65, the next quartile).
    #[serde(default = "default_high_percentile")]
    pub high_percentile: f64,
    /// Percentile rank at or above which a file is MEDIUM (default: 0.4).
    #[serde(default = "default_medium_percentile")]
    pub medium_percentile: f64,
}

fn default_critical_percentile() -> f64 {
    0.9
}

fn default_high_percentile() -> f64 {
    0.65
}

fn default_medium_percentile() -> f64 {
    0.4
}

impl Default for CriticalFileOptions {
    fn default() -> Self {
        Self {
            lookback_months: default_lookback_months(),
            critical_percentile: default_critical_percentile(),
            high_percentile: default_high_percentile(),
            medium_percentile: default_medium_percentile(),
        }
    }
}

impl CriticalFileOptions {
    /// Check every option against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::InvalidOption`] for the first violation.
    pub fn validate(&self) -> Result<(), VitalsError> {
        require_months("critical_files.lookback_months", self.lookback_months)?;
        for (name, value) in [
            ("critical_files.critical_percentile", self.critical_percentile),
            ("critical_files.high_percentile", self.high_percentile),
            ("critical_files.medium_percentile", self.medium_percentile),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(VitalsError::invalid_option(
                    name,
                    format!("must be in [0, 1], got {value}"),
                ));
            }
        }
        if self.critical_percentile < self.high_percentile
            || self.high_percentile < self.medium_percentile
        {
            return Err(VitalsError::invalid_option(
                "critical_files",
                "cut lines must satisfy critical_percentile >= high_percentile >= medium_percentile",
            ));
        }
        Ok(())
    }
}

/// Options for the single-point-of-failure analyzer.
///
/// # Examples
///
/// ```
/// use gitvitals_core::SinglePointOfFailureOptions;
///
/// let opts = SinglePointOfFailureOptions::default();
/// assert_eq!(opts.dominance_threshold, 0.8);
/// assert_eq!(opts.max_contributors, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinglePointOfFailureOptions {
    /// History window in months of 30 days (default: 6, in `1..=1200`).
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
    /// Recency half-life in days (default: 90).
    #[serde(default = "default_half_life_days")]
    pub decay_half_life_days: f64,
    /// Share a single contributor must exceed (default: 0.8, in `(0, 1]`).
    #[serde(default = "default_dominance_threshold")]
    pub dominance_threshold: f64,
    /// Most distinct contributors a flagged file may have (default: 2, must be > 0).
    #[serde(default = "default_max_contributors")]
    pub max_contributors: usize,
}

fn default_dominance_threshold() -> f64 {
    0.8
}

fn default_max_contributors() -> usize {
    2
}

impl Default for SinglePointOfFailureOptions {
    fn default() -> Self {
        Self {
            lookback_months: default_lookback_months(),
            decay_half_life_days: default_half_life_days(),
            dominance_threshold: default_dominance_threshold(),
            max_contributors: default_max_contributors(),
        }
    }
}

impl SinglePointOfFailureOptions {
    /// Check every option against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::InvalidOption`] for the first violation.
    pub fn validate(&self) -> Result<(), VitalsError> {
        require_months(
            "single_point_of_failure.lookback_months",
            self.lookback_months,
        )?;
        require_positive(
            "single_point_of_failure.decay_half_life_days",
            self.decay_half_life_days,
        )?;
        require_fraction(
            "single_point_of_failure.dominance_threshold",
            self.dominance_threshold,
        )?;
        if self.max_contributors == 0 {
            return Err(VitalsError::invalid_option(
                "single_point_of_failure.max_contributors",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// Options for the flow efficiency analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEfficiencyOptions {
    /// Glob patterns selecting the branches to measure.
    #[serde(default = "default_branch_patterns")]
    pub branch_patterns: Vec<String>,
}

impl Default for FlowEfficiencyOptions {
    fn default() -> Self {
        Self {
            branch_patterns: default_branch_patterns(),
        }
    }
}

impl FlowEfficiencyOptions {
    /// Check every option against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::InvalidOption`] for the first violation.
    pub fn validate(&self) -> Result<(), VitalsError> {
        require_patterns("flow_efficiency.branch_patterns", &self.branch_patterns)
    }
}

/// Options for the branch lifecycle analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchLifecycleOptions {
    /// Glob patterns selecting the branches to measure.
    #[serde(default = "default_branch_patterns")]
    pub branch_patterns: Vec<String>,
    /// Include branches that have not been merged yet (default: true).
    #[serde(default = "default_true")]
    pub include_open: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BranchLifecycleOptions {
    fn default() -> Self {
        Self {
            branch_patterns: default_branch_patterns(),
            include_open: true,
        }
    }
}

impl BranchLifecycleOptions {
    /// Check every option against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::InvalidOption`] for the first violation.
    pub fn validate(&self) -> Result<(), VitalsError> {
        require_patterns("branch_lifecycle.branch_patterns", &self.branch_patterns)
    }
}

/// Options for the velocity trend analyzer.
///
/// # Examples
///
/// ```
/// use gitvitals_core::VelocityTrendOptions;
///
/// let opts = VelocityTrendOptions { weeks_lookback: 0, ..Default::default() };
/// assert!(opts.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityTrendOptions {
    /// Number of weekly bins ending at `as_of` (default: 12, in `1..=5200`).
    #[serde(default = "default_weeks_lookback")]
    pub weeks_lookback: u32,
    /// |t| a slope must exceed to count as a trend (default: 2.0, must be > 0).
    #[serde(default = "default_min_t_statistic")]
    pub min_t_statistic: f64,
}

fn default_weeks_lookback() -> u32 {
    12
}

fn default_min_t_statistic() -> f64 {
    2.0
}

impl Default for VelocityTrendOptions {
    fn default() -> Self {
        Self {
            weeks_lookback: default_weeks_lookback(),
            min_t_statistic: default_min_t_statistic(),
        }
    }
}

impl VelocityTrendOptions {
    /// Check every option against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::InvalidOption`] for the first violation.
    pub fn validate(&self) -> Result<(), VitalsError> {
        if self.weeks_lookback == 0 || self.weeks_lookback > MAX_WEEKS_LOOKBACK {
            return Err(VitalsError::invalid_option(
                "velocity_trend.weeks_lookback",
                format!(
                    "must be in 1..={MAX_WEEKS_LOOKBACK}, got {}",
                    self.weeks_lookback
                ),
            ));
        }
        require_positive("velocity_trend.min_t_statistic", self.min_t_statistic)
    }
}

/// Options for the cycle time analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleTimeOptions {
    /// Glob patterns selecting the branches to measure.
    #[serde(default = "default_branch_patterns")]
    pub branch_patterns: Vec<String>,
    /// Only branches merged within this many 30-day months count (default: 6, in `1..=1200`).
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
}

impl Default for CycleTimeOptions {
    fn default() -> Self {
        Self {
            branch_patterns: default_branch_patterns(),
            lookback_months: default_lookback_months(),
        }
    }
}

impl CycleTimeOptions {
    /// Check every option against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::InvalidOption`] for the first violation.
    pub fn validate(&self) -> Result<(), VitalsError> {
        require_patterns("cycle_time.branch_patterns", &self.branch_patterns)?;
        require_months("cycle_time.lookback_months", self.lookback_months)
    }
}

/// Branch patterns used when none are configured.
///
/// # Examples
///
/// ```
/// let patterns = gitvitals_core::default_branch_patterns();
/// assert_eq!(patterns, vec!["feature/*", "bugfix/*", "hotfix/*"]);
/// ```
pub fn default_branch_patterns() -> Vec<String> {
    vec!["feature/*".into(), "bugfix/*".into(), "hotfix/*".into()]
}

fn default_lookback_months() -> u32 {
    6
}

fn default_knowledge_threshold() -> f64 {
    0.8
}

fn default_half_life_days() -> f64 {
    90.0
}

fn require_months(name: &str, months: u32) -> Result<(), VitalsError> {
    if months == 0 || months > MAX_LOOKBACK_MONTHS {
        return Err(VitalsError::invalid_option(
            name,
            format!("must be in 1..={MAX_LOOKBACK_MONTHS}, got {months}"),
        ));
    }
    Ok(())
}

fn require_positive(name: &str, value: f64) -> Result<(), VitalsError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(VitalsError::invalid_option(
            name,
            format!("must be a finite number > 0, got {value}"),
        ));
    }
    Ok(())
}

/// Accepts the half-open unit interval `(0, 1]`.
fn require_fraction(name: &str, value: f64) -> Result<(), VitalsError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(VitalsError::invalid_option(
            name,
            format!("must be in (0, 1], got {value}"),
        ));
    }
    Ok(())
}

fn require_patterns(name: &str, patterns: &[String]) -> Result<(), VitalsError> {
    if patterns.is_empty() {
        return Err(VitalsError::invalid_option(
            name,
            "at least one pattern is required",
        ));
    }
    if let Some(blank) = patterns.iter().find(|p| p.trim().is_empty()) {
        return Err(VitalsError::invalid_option(
            name,
            format!("blank pattern {blank:?}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option_name(err: VitalsError) -> String {
        match err {
            VitalsError::InvalidOption { option, .. } => option,
            other => panic!("expected InvalidOption, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(MetricsConfig::default().validate().is_ok());
    }

    #[test]
    fn knowledge_threshold_domain_is_half_open() {
        let mut opts = BusFactorOptions::default();
        opts.knowledge_threshold = 1.0;
        assert!(opts.validate().is_ok());

        opts.knowledge_threshold = 0.0;
        let err = opts.validate().unwrap_err();
        assert_eq!(option_name(err), "bus_factor.knowledge_threshold");

        opts.knowledge_threshold = 1.01;
        assert!(opts.validate().is_err());

        opts.knowledge_threshold = f64::NAN;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn zero_lookback_is_rejected() {
        let opts = BusFactorOptions {
            lookback_months: 0,
            ..BusFactorOptions::default()
        };
        assert_eq!(
            option_name(opts.validate().unwrap_err()),
            "bus_factor.lookback_months"
        );
    }

    #[test]
    fn lookback_has_an_upper_bound() {
        let mut config = MetricsConfig::default();
        config.set_lookback_months(MAX_LOOKBACK_MONTHS);
        assert!(config.validate().is_ok());

        config.set_lookback_months(MAX_LOOKBACK_MONTHS + 1);
        assert_eq!(
            option_name(config.validate().unwrap_err()),
            "bus_factor.lookback_months"
        );

        let opts = CycleTimeOptions {
            lookback_months: u32::MAX,
            ..CycleTimeOptions::default()
        };
        assert_eq!(
            option_name(opts.validate().unwrap_err()),
            "cycle_time.lookback_months"
        );
    }

    #[test]
    fn weeks_lookback_has_an_upper_bound() {
        let mut opts = VelocityTrendOptions {
            weeks_lookback: MAX_WEEKS_LOOKBACK,
            ..VelocityTrendOptions::default()
        };
        assert!(opts.validate().is_ok());

        opts.weeks_lookback = u32::MAX;
        assert_eq!(
            option_name(opts.validate().unwrap_err()),
            "velocity_trend.weeks_lookback"
        );
    }

    #[test]
    fn non_positive_half_life_is_rejected() {
        let opts = KnowledgeDistributionOptions {
            decay_half_life_days: -3.0,
            ..KnowledgeDistributionOptions::default()
        };
        assert_eq!(
            option_name(opts.validate().unwrap_err()),
            "knowledge_distribution.decay_half_life_days"
        );
    }

    #[test]
    fn critical_cut_lines_must_be_ordered() {
        let opts = CriticalFileOptions {
            critical_percentile: 0.5,
            high_percentile: 0.7,
            ..CriticalFileOptions::default()
        };
        assert_eq!(option_name(opts.validate().unwrap_err()), "critical_files");

        let opts = CriticalFileOptions {
            medium_percentile: -0.1,
            ..CriticalFileOptions::default()
        };
        assert_eq!(
            option_name(opts.validate().unwrap_err()),
            "critical_files.medium_percentile"
        );
    }

    #[test]
    fn spof_requires_at_least_one_contributor() {
        let opts = SinglePointOfFailureOptions {
            max_contributors: 0,
            ..SinglePointOfFailureOptions::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn empty_or_blank_patterns_are_rejected() {
        let opts = FlowEfficiencyOptions {
            branch_patterns: vec![],
        };
        assert!(opts.validate().is_err());

        let opts = CycleTimeOptions {
            branch_patterns: vec!["feature/*".into(), "  ".into()],
            ..CycleTimeOptions::default()
        };
        assert_eq!(
            option_name(opts.validate().unwrap_err()),
            "cycle_time.branch_patterns"
        );
    }

    #[test]
    fn velocity_t_statistic_must_be_positive() {
        let opts = VelocityTrendOptions {
            min_t_statistic: 0.0,
            ..VelocityTrendOptions::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn overrides_touch_every_section() {
        let mut config = MetricsConfig::default();
        config.set_lookback_months(3);
        config.set_branch_patterns(vec!["release/*".into()]);

        assert_eq!(config.bus_factor.lookback_months, 3);
        assert_eq!(config.knowledge_distribution.lookback_months, 3);
        assert_eq!(config.critical_files.lookback_months, 3);
        assert_eq!(config.single_point_of_failure.lookback_months, 3);
        assert_eq!(config.cycle_time.lookback_months, 3);
        assert_eq!(config.flow_efficiency.branch_patterns, vec!["release/*"]);
        assert_eq!(config.branch_lifecycle.branch_patterns, vec!["release/*"]);
        assert_eq!(config.cycle_time.branch_patterns, vec!["release/*"]);
    }
}
