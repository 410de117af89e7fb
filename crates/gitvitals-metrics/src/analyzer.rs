use chrono::{DateTime, Duration, Utc};
use gitvitals_core::{MetricsConfig, Result, VitalsError};

use crate::registry::MetricKind;
use crate::result::AnalysisResult;

/// A repository-health metric computed over a history feed.
///
/// Implementations borrow their feed and hold no other state, so
/// `calculate` is a pure function of the feed snapshot, the options and
/// `as_of`. Options are validated before any history is read.
pub trait MetricAnalyzer {
    /// Which metric this analyzer computes.
    fn kind(&self) -> MetricKind;

    /// One-line description of the metric.
    fn description(&self) -> &'static str {
        self.kind().description()
    }

    /// Compute the metric as seen at `as_of`.
    ///
    /// # Errors
    ///
    /// Returns [`gitvitals_core::VitalsError::InvalidOption`] for options
    /// outside their domain, or the feed's error if history cannot be read.
    fn calculate(&self, config: &MetricsConfig, as_of: DateTime<Utc>) -> Result<AnalysisResult>;

    /// Recommendations derived from a result of this analyzer.
    ///
    /// Returns an empty list for a result produced by another analyzer.
    fn recommendations(&self, result: &AnalysisResult) -> Vec<String>;
}

/// Start of a lookback window of `months` 30-day months ending at `as_of`.
///
/// `option` names the setting blamed when the window leaves chrono's range.
pub(crate) fn window_start(
    as_of: DateTime<Utc>,
    months: u32,
    option: &str,
) -> Result<DateTime<Utc>> {
    days_before(as_of, 30 * i64::from(months), option)
}

/// `as_of` minus `days`, or [`VitalsError::InvalidOption`] on overflow.
pub(crate) fn days_before(
    as_of: DateTime<Utc>,
    days: i64,
    option: &str,
) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|span| as_of.checked_sub_signed(span))
        .ok_or_else(|| {
            VitalsError::invalid_option(
                option,
                format!("a window of {days} days before {as_of} is out of range"),
            )
        })
}
