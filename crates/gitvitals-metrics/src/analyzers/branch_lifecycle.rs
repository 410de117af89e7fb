//! Branch lifecycle: how long branches spend in each phase.

use chrono::{DateTime, Utc};
use gitvitals_core::{MetricsConfig, Result, RiskLevel};
use gitvitals_history::{Branch, HistoryFeed};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{branches_as_of, hours_between};
use crate::analyzer::MetricAnalyzer;
use crate::registry::MetricKind;
use crate::result::{AnalysisResult, MetricReport};
use crate::stats::{mean, median, percentile};

const HOURS_PER_DAY: f64 = 24.0;
const FAST_DELIVERY_DAYS: f64 = 3.0;
const NORMAL_DELIVERY_DAYS: f64 = 14.0;

/// Phase durations of one branch, in hours.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use gitvitals_history::{Branch, Commit};
/// use gitvitals_metrics::analyzers::BranchPhases;
///
/// let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
/// let commit = |hash: &str, at| Commit {
///     hash: hash.into(),
///     author: "dev".into(),
///     email: "dev@example.com".into(),
///     timestamp: at,
///     message: "wip".into(),
///     files_changed: vec![],
/// };
/// let branch = Branch {
///     name: "feature/x".into(),
///     created_at: t0,
///     merged_at: Some(t0 + Duration::hours(30)),
///     commits: vec![commit("a", t0 + Duration::hours(2)), commit("b", t0 + Duration::hours(26))],
/// };
/// let phases = BranchPhases::measure(&branch, t0 + Duration::days(7)).unwrap();
/// assert_eq!(phases.creation_to_first_commit, 2.0);
/// assert_eq!(phases.development_duration, 24.0);
/// assert_eq!(phases.merge_duration, Some(4.0));
/// assert_eq!(phases.total, 30.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchPhases {
    pub name: String,
    /// Creation to first commit.
    pub creation_to_first_commit: f64,
    /// First to last commit.
    pub development_duration: f64,
    /// Last commit to merge; absent while open.
    pub merge_duration: Option<f64>,
    /// Creation to merge, or to `as_of` while open.
    pub total: f64,
    pub merged: bool,
}

impl BranchPhases {
    /// Measure `branch`; `None` when it has no commits.
    pub fn measure(branch: &Branch, as_of: DateTime<Utc>) -> Option<Self> {
        let first = branch.first_commit_at()?;
        let last = branch.last_commit_at()?;
        let created = branch.created_at.min(first);

        Some(Self {
            name: branch.name.clone(),
            creation_to_first_commit: hours_between(created, first),
            development_duration: hours_between(first, last),
            merge_duration: branch.merged_at.map(|merged| hours_between(last, merged)),
            total: hours_between(created, branch.merged_at.unwrap_or(as_of)),
            merged: branch.is_merged(),
        })
    }

    pub fn total_days(&self) -> f64 {
        self.total / HOURS_PER_DAY
    }
}

/// Summary statistics of one phase, in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub p90: f64,
    pub min: f64,
    pub max: f64,
}

impl PhaseStats {
    /// `None` for an empty sample.
    pub fn from_hours(values: &[f64]) -> Option<Self> {
        Some(Self {
            count: values.len(),
            mean: mean(values)?,
            median: median(values)?,
            p90: percentile(values, 0.9)?,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Statistics for every phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSummary {
    pub creation_to_first_commit: Option<PhaseStats>,
    pub development_duration: Option<PhaseStats>,
    /// Merged branches only.
    pub merge_duration: Option<PhaseStats>,
    pub total: Option<PhaseStats>,
}

/// Merged branches by total lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPatterns {
    /// Under 3 days.
    pub fast: usize,
    /// 3 to 14 days.
    pub normal: usize,
    /// Over 14 days.
    pub slow: usize,
}

/// Branch lifecycle figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchLifecycleReport {
    pub branches: Vec<BranchPhases>,
    pub aggregate_stats: PhaseSummary,
    pub delivery_patterns: DeliveryPatterns,
    /// Mean total lifetime in days over every analyzed branch.
    pub mean_total_days: Option<f64>,
    pub open_branches: usize,
    pub include_open: bool,
    pub branch_patterns: Vec<String>,
}

impl BranchLifecycleReport {
    pub fn from_branches(
        branches: &[Branch],
        as_of: DateTime<Utc>,
        include_open: bool,
        patterns: &[String],
    ) -> Self {
        let phases: Vec<BranchPhases> = branches
            .iter()
            .filter(|b| include_open || b.is_merged())
            .filter_map(|b| BranchPhases::measure(b, as_of))
            .collect();

        let column = |f: fn(&BranchPhases) -> Option<f64>| -> Vec<f64> {
            phases.iter().filter_map(f).collect()
        };
        let aggregate_stats = PhaseSummary {
            creation_to_first_commit: PhaseStats::from_hours(&column(|p| {
                Some(p.creation_to_first_commit)
            })),
            development_duration: PhaseStats::from_hours(&column(|p| Some(p.development_duration))),
            merge_duration: PhaseStats::from_hours(&column(|p| p.merge_duration)),
            total: PhaseStats::from_hours(&column(|p| Some(p.total))),
        };

        let mut delivery_patterns = DeliveryPatterns::default();
        for branch in phases.iter().filter(|p| p.merged) {
            let days = branch.total_days();
            if days < FAST_DELIVERY_DAYS {
                delivery_patterns.fast += 1;
            } else if days <= NORMAL_DELIVERY_DAYS {
                delivery_patterns.normal += 1;
            } else {
                delivery_patterns.slow += 1;
            }
        }

        let totals: Vec<f64> = phases.iter().map(BranchPhases::total_days).collect();
        Self {
            mean_total_days: mean(&totals),
            open_branches: phases.iter().filter(|p| !p.merged).count(),
            branches: phases,
            aggregate_stats,
            delivery_patterns,
            include_open,
            branch_patterns: patterns.to_vec(),
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        match self.mean_total_days {
            None => RiskLevel::Unknown,
            Some(days) if days > 30.0 => RiskLevel::High,
            Some(days) if days > 14.0 => RiskLevel::Medium,
            Some(_) => RiskLevel::Low,
        }
    }
}

/// Breaks branch lifetimes into creation, development and merge phases.
pub struct BranchLifecycleAnalyzer<'a> {
    feed: &'a dyn HistoryFeed,
}

impl<'a> BranchLifecycleAnalyzer<'a> {
    pub fn new(feed: &'a dyn HistoryFeed) -> Self {
        Self { feed }
    }
}

impl MetricAnalyzer for BranchLifecycleAnalyzer<'_> {
    fn kind(&self) -> MetricKind {
        MetricKind::BranchLifecycle
    }

    fn calculate(&self, config: &MetricsConfig, as_of: DateTime<Utc>) -> Result<AnalysisResult> {
        let options = &config.branch_lifecycle;
        options.validate()?;

        let branches = branches_as_of(self.feed, &options.branch_patterns, as_of)?;
        let report = BranchLifecycleReport::from_branches(
            &branches,
            as_of,
            options.include_open,
            &options.branch_patterns,
        );
        debug!(
            branches = report.branches.len(),
            open = report.open_branches,
            "branch lifecycle"
        );
        let risk_level = report.risk_level();

        Ok(AnalysisResult {
            metric: self.kind(),
            as_of,
            risk_level,
            recommendations: recommend(&report),
            report: MetricReport::BranchLifecycle(report),
        })
    }

    fn recommendations(&self, result: &AnalysisResult) -> Vec<String> {
        match &result.report {
            MetricReport::BranchLifecycle(report) => recommend(report),
            _ => Vec::new(),
        }
    }
}

fn recommend(report: &BranchLifecycleReport) -> Vec<String> {
    let Some(mean_days) = report.mean_total_days else {
        return vec![format!(
            "No branches match {}; adjust branch_patterns to measure branch lifecycles",
            report.branch_patterns.join(", ")
        )];
    };

    let mut recs = Vec::new();
    if mean_days > 30.0 {
        recs.push(format!(
            "Branches live {mean_days:.1} days on average; split work so branches merge within two weeks"
        ));
    } else if mean_days > 14.0 {
        recs.push(format!(
            "Branches live {mean_days:.1} days on average; aim for under two weeks"
        ));
    } else {
        recs.push("Branch lifetimes are short; keep it up".into());
    }

    if let Some(start) = &report.aggregate_stats.creation_to_first_commit {
        if start.mean > HOURS_PER_DAY {
            recs.push(
                "Branches wait over a day before the first commit; create them when work starts"
                    .into(),
            );
        }
    }
    if let Some(merge) = &report.aggregate_stats.merge_duration {
        if merge.mean > 2.0 * HOURS_PER_DAY {
            recs.push(format!(
                "Finished branches wait {:.1} days for merge; speed up review",
                merge.mean / HOURS_PER_DAY
            ));
        }
    }
    let patterns = &report.delivery_patterns;
    if patterns.slow > patterns.fast + patterns.normal {
        recs.push("Most merged branches took over two weeks; deliver in smaller slices".into());
    }
    recs
}
