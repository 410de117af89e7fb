//! Cycle time: first commit to merge for recently merged branches.

use std::fmt;

use chrono::{DateTime, Utc};
use gitvitals_core::{MetricsConfig, Result, RiskLevel};
use gitvitals_history::{Branch, HistoryFeed};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::branches_as_of;
use crate::analyzer::{window_start, MetricAnalyzer};
use crate::registry::MetricKind;
use crate::result::{AnalysisResult, MetricReport};
use crate::stats::{mean, median, percentile, sample_std_dev};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Cycle time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleCategory {
    /// Under a day.
    VeryFast,
    /// Up to 3 days.
    Fast,
    /// Up to a week.
    Normal,
    /// Up to two weeks.
    Slow,
    /// Over two weeks.
    VerySlow,
}

impl CycleCategory {
    /// Bucket for a cycle time in days.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitvitals_metrics::analyzers::CycleCategory;
    ///
    /// assert_eq!(CycleCategory::from_days(0.5), CycleCategory::VeryFast);
    /// assert_eq!(CycleCategory::from_days(3.0), CycleCategory::Fast);
    /// assert_eq!(CycleCategory::from_days(100.0), CycleCategory::VerySlow);
    /// ```
    pub fn from_days(days: f64) -> Self {
        if days < 1.0 {
            CycleCategory::VeryFast
        } else if days <= 3.0 {
            CycleCategory::Fast
        } else if days <= 7.0 {
            CycleCategory::Normal
        } else if days <= 14.0 {
            CycleCategory::Slow
        } else {
            CycleCategory::VerySlow
        }
    }
}

impl fmt::Display for CycleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleCategory::VeryFast => "very fast",
            CycleCategory::Fast => "fast",
            CycleCategory::Normal => "normal",
            CycleCategory::Slow => "slow",
            CycleCategory::VerySlow => "very slow",
        };
        f.write_str(name)
    }
}

/// One merged branch in the sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSample {
    pub branch: String,
    pub first_commit_at: DateTime<Utc>,
    pub merged_at: DateTime<Utc>,
    pub days: f64,
    pub category: CycleCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleTimePercentiles {
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl CycleTimePercentiles {
    fn from_days(days: &[f64]) -> Option<Self> {
        Some(Self {
            p50: percentile(days, 0.5)?,
            p75: percentile(days, 0.75)?,
            p90: percentile(days, 0.9)?,
            p95: percentile(days, 0.95)?,
            p99: percentile(days, 0.99)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleCategoryCounts {
    pub very_fast: usize,
    pub fast: usize,
    pub normal: usize,
    pub slow: usize,
    pub very_slow: usize,
}

impl CycleCategoryCounts {
    fn record(&mut self, category: CycleCategory) {
        match category {
            CycleCategory::VeryFast => self.very_fast += 1,
            CycleCategory::Fast => self.fast += 1,
            CycleCategory::Normal => self.normal += 1,
            CycleCategory::Slow => self.slow += 1,
            CycleCategory::VerySlow => self.very_slow += 1,
        }
    }
}

/// Cycle time figures, all in days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleTimeReport {
    /// Absent for an empty sample.
    pub percentiles: Option<CycleTimePercentiles>,
    pub categories: CycleCategoryCounts,
    pub mean_days: Option<f64>,
    pub median_days: Option<f64>,
    /// Sample standard deviation.
    pub std_dev_days: f64,
    /// Samples above p95, slowest first.
    pub outliers: Vec<CycleSample>,
    /// Every sample, oldest merge first.
    pub samples: Vec<CycleSample>,
    pub lookback_months: u32,
}

impl CycleTimeReport {
    /// Sample branches merged within `[since, as_of]`.
    pub fn from_branches(
        branches: &[Branch],
        since: DateTime<Utc>,
        as_of: DateTime<Utc>,
        lookback_months: u32,
    ) -> Self {
        let mut samples: Vec<CycleSample> = branches
            .iter()
            .filter_map(|branch| {
                let merged_at = branch.merged_at.filter(|m| *m >= since && *m <= as_of)?;
                let first_commit_at = branch.first_commit_at()?;
                let seconds = (merged_at - first_commit_at).num_seconds().max(0);
                let days = seconds as f64 / SECONDS_PER_DAY;
                Some(CycleSample {
                    branch: branch.name.clone(),
                    first_commit_at,
                    merged_at,
                    days,
                    category: CycleCategory::from_days(days),
                })
            })
            .collect();
        samples.sort_by(|a, b| {
            a.merged_at
                .cmp(&b.merged_at)
                .then_with(|| a.branch.cmp(&b.branch))
        });

        let days: Vec<f64> = samples.iter().map(|s| s.days).collect();
        let percentiles = CycleTimePercentiles::from_days(&days);
        let mut categories = CycleCategoryCounts::default();
        for sample in &samples {
            categories.record(sample.category);
        }

        let mut outliers: Vec<CycleSample> = match &percentiles {
            Some(p) => samples.iter().filter(|s| s.days > p.p95).cloned().collect(),
            None => Vec::new(),
        };
        outliers.sort_by(|a, b| b.days.total_cmp(&a.days));

        Self {
            percentiles,
            categories,
            mean_days: mean(&days),
            median_days: median(&days),
            std_dev_days: sample_std_dev(&days),
            outliers,
            samples,
            lookback_months,
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        match self.mean_days {
            None => RiskLevel::Unknown,
            Some(days) if days > 21.0 => RiskLevel::Critical,
            Some(days) if days > 14.0 => RiskLevel::High,
            Some(days) if days > 7.0 => RiskLevel::Medium,
            Some(_) => RiskLevel::Low,
        }
    }
}

/// Measures first-commit-to-merge time of merged branches.
pub struct CycleTimeAnalyzer<'a> {
    feed: &'a dyn HistoryFeed,
}

impl<'a> CycleTimeAnalyzer<'a> {
    pub fn new(feed: &'a dyn HistoryFeed) -> Self {
        Self { feed }
    }
}

impl MetricAnalyzer for CycleTimeAnalyzer<'_> {
    fn kind(&self) -> MetricKind {
        MetricKind::CycleTime
    }

    fn calculate(&self, config: &MetricsConfig, as_of: DateTime<Utc>) -> Result<AnalysisResult> {
        let options = &config.cycle_time;
        options.validate()?;

        let since = window_start(as_of, options.lookback_months, "cycle_time.lookback_months")?;
        let branches = branches_as_of(self.feed, &options.branch_patterns, as_of)?;
        let report = CycleTimeReport::from_branches(&branches, since, as_of, options.lookback_months);
        debug!(samples = report.samples.len(), mean = ?report.mean_days, "cycle time");
        let risk_level = report.risk_level();

        Ok(AnalysisResult {
            metric: self.kind(),
            as_of,
            risk_level,
            recommendations: recommend(&report),
            report: MetricReport::CycleTime(report),
        })
    }

    fn recommendations(&self, result: &AnalysisResult) -> Vec<String> {
        match &result.report {
            MetricReport::CycleTime(report) => recommend(report),
            _ => Vec::new(),
        }
    }
}

fn recommend(report: &CycleTimeReport) -> Vec<String> {
    let (Some(mean_days), Some(p)) = (report.mean_days, &report.percentiles) else {
        return vec![format!(
            "No matching branches were merged in the last {} months; cycle time needs merged branches",
            report.lookback_months
        )];
    };

    let mut recs = Vec::new();
    if mean_days > 14.0 {
        recs.push(format!(
            "Average cycle time is {mean_days:.1} days; break work into smaller changes"
        ));
        recs.push("Look for long waits in review, testing and deployment".into());
    } else if mean_days > 7.0 {
        recs.push(format!(
            "Average cycle time is {mean_days:.1} days; aim for under a week"
        ));
    } else {
        recs.push(format!(
            "Average cycle time is {mean_days:.1} days; delivery is quick"
        ));
    }

    if !report.outliers.is_empty() {
        let names: Vec<&str> = report
            .outliers
            .iter()
            .take(3)
            .map(|s| s.branch.as_str())
            .collect();
        recs.push(format!(
            "{} branches took far longer than the rest: {}",
            report.outliers.len(),
            names.join(", ")
        ));
    }
    recs.push(format!(
        "For planning: half of changes ship within {:.1} days, 90% within {:.1} days",
        p.p50, p.p90
    ));
    recs
}
