//! The eight metric analyzers.
//!
//! Knowledge-based analyzers (bus factor, knowledge distribution, critical
//! files, single points of failure) read commits in a lookback window and
//! build a [`crate::KnowledgeModel`]. Branch-based analyzers (flow
//! efficiency, branch lifecycle, cycle time) read branches selected by glob
//! patterns. The velocity analyzer bins commits into weeks.

mod branch_lifecycle;
mod bus_factor;
mod critical_files;
mod cycle_time;
mod flow_efficiency;
mod knowledge_distribution;
mod single_point_of_failure;
mod velocity_trend;

pub use branch_lifecycle::{
    BranchLifecycleAnalyzer, BranchLifecycleReport, BranchPhases, DeliveryPatterns, PhaseStats,
    PhaseSummary,
};
pub use bus_factor::{BusFactorAnalyzer, BusFactorReport};
pub use critical_files::{CategoryCounts, CriticalFile, CriticalFileAnalyzer, CriticalFileReport};
pub use cycle_time::{
    CycleCategory, CycleCategoryCounts, CycleSample, CycleTimeAnalyzer, CycleTimePercentiles,
    CycleTimeReport,
};
pub use flow_efficiency::{
    BandCounts, BranchFlow, FlowBand, FlowEfficiencyAnalyzer, FlowEfficiencyReport,
};
pub use knowledge_distribution::{
    DistributionQuality, KnowledgeDistributionAnalyzer, KnowledgeDistributionReport,
};
pub use single_point_of_failure::{
    is_single_point_of_failure, Dominator, SinglePointOfFailureAnalyzer,
    SinglePointOfFailureReport, SpofFile,
};
pub use velocity_trend::{
    Trend, TrendConfidence, TrendDirection, VelocityTrendAnalyzer, VelocityTrendReport, WeekBin,
};

use chrono::{DateTime, Utc};
use gitvitals_core::Result;
use gitvitals_history::{Branch, BranchFilter, Contributor, HistoryFeed};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A contributor's share of the knowledge in scope.
///
/// # Examples
///
/// ```
/// use gitvitals_metrics::analyzers::ContributorShare;
///
/// let share = ContributorShare {
///     contributor: "alice@example.com".into(),
///     knowledge: 42.0,
///     share: 0.6,
/// };
/// assert!(share.share <= 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorShare {
    /// Contributor identity key.
    pub contributor: Contributor,
    /// Absolute knowledge weight.
    pub knowledge: f64,
    /// Fraction of the total, in `[0, 1]`.
    pub share: f64,
}

/// Branches matching `patterns`, trimmed to what was visible at `as_of`.
///
/// Commits after `as_of` are dropped, a merge after `as_of` is treated as
/// not yet merged, and branches with no remaining commits are skipped.
pub(crate) fn branches_as_of(
    feed: &dyn HistoryFeed,
    patterns: &[String],
    as_of: DateTime<Utc>,
) -> Result<Vec<Branch>> {
    let filter = BranchFilter::new(patterns)?;
    let branches: Vec<Branch> = feed
        .list_branches(&filter)?
        .into_iter()
        .filter_map(|mut branch| {
            branch.commits.retain(|c| c.timestamp <= as_of);
            if branch.commits.is_empty() {
                return None;
            }
            branch.merged_at = branch.merged_at.filter(|merged| *merged <= as_of);
            Some(branch)
        })
        .collect();
    debug!(branches = branches.len(), "selected branches");
    Ok(branches)
}

/// Whole days between two instants, never negative.
pub(crate) fn whole_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_days().max(0)
}

/// Hours between two instants, never negative.
pub(crate) fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_seconds() as f64 / 3600.0).max(0.0)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use gitvitals_history::MemoryHistory;

    #[test]
    fn branches_as_of_hides_the_future() {
        let feed = MemoryHistory::new()
            .with_branch(make_branch("feature/done", 10.0, &[9.0, 8.0], Some(5.0)))
            .with_branch(make_branch("feature/late-merge", 10.0, &[9.0], Some(-2.0)))
            .with_branch(make_branch("feature/future", -1.0, &[-1.0], None))
            .with_branch(make_branch("release/x", 10.0, &[9.0], None));
        let patterns = gitvitals_core::default_branch_patterns();
        let branches = branches_as_of(&feed, &patterns, as_of()).unwrap();

        let names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["feature/done", "feature/late-merge"]);
        assert!(branches[0].is_merged());
        assert!(!branches[1].is_merged());
    }

    #[test]
    fn durations_never_go_negative() {
        assert_eq!(whole_days(days_ago(1.0), days_ago(3.0)), 0);
        assert_eq!(whole_days(days_ago(3.5), days_ago(1.0)), 2);
        assert_eq!(hours_between(days_ago(0.0), days_ago(1.0)), 0.0);
        assert_eq!(hours_between(days_ago(1.0), days_ago(0.5)), 12.0);
    }
}
