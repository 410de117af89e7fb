//! Velocity trend: weekly commit counts and a least-squares trend line.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use gitvitals_core::{MetricsConfig, Result, RiskLevel, VelocityTrendOptions};
use gitvitals_history::{Commit, Contributor, HistoryFeed};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzer::{days_before, MetricAnalyzer};
use crate::registry::MetricKind;
use crate::result::{AnalysisResult, MetricReport};
use crate::stats::linear_regression;

/// Non-empty weeks needed before a trend is trusted.
const MIN_ACTIVE_WEEKS: usize = 4;

/// Which way a series is heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        };
        f.write_str(name)
    }
}

/// How well the trend line explains the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendConfidence {
    High,
    Medium,
    Low,
    Unknown,
}

impl fmt::Display for TrendConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrendConfidence::High => "HIGH",
            TrendConfidence::Medium => "MEDIUM",
            TrendConfidence::Low => "LOW",
            TrendConfidence::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

impl TrendConfidence {
    fn from_r_squared(r_squared: f64) -> Self {
        if r_squared >= 0.7 {
            TrendConfidence::High
        } else if r_squared >= 0.4 {
            TrendConfidence::Medium
        } else {
            TrendConfidence::Low
        }
    }
}

/// Trend line over one weekly series.
///
/// # Examples
///
/// ```
/// use gitvitals_metrics::analyzers::{Trend, TrendConfidence, TrendDirection};
///
/// let trend = Trend::fit(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 6, 2.0);
/// assert_eq!(trend.direction, TrendDirection::Increasing);
/// assert_eq!(trend.confidence, TrendConfidence::High);
///
/// let sparse = Trend::fit(&[0.0, 0.0, 1.0, 5.0, 9.0], 3, 2.0);
/// assert_eq!(sparse.direction, TrendDirection::Stable);
/// assert_eq!(sparse.confidence, TrendConfidence::Unknown);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    /// Change per week.
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Absent for an exact fit or too few points.
    pub t_statistic: Option<f64>,
    pub direction: TrendDirection,
    pub confidence: TrendConfidence,
}

impl Trend {
    /// Fit `series` (one value per week, oldest first).
    pub fn fit(series: &[f64], non_empty_weeks: usize, min_t_statistic: f64) -> Self {
        let Some(fit) = linear_regression(series) else {
            return Self::insufficient(0.0, 0.0);
        };
        if non_empty_weeks < MIN_ACTIVE_WEEKS {
            return Self::insufficient(fit.slope, fit.intercept);
        }

        // A strictly monotonic series has a direction whatever its curvature.
        let significant = strictly_monotonic(series)
            || match fit.t_statistic {
                Some(t) => t.abs() > min_t_statistic,
                None => fit.is_exact() && fit.slope.abs() > f64::EPSILON,
            };
        let direction = if !significant {
            TrendDirection::Stable
        } else if fit.slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        };

        Self {
            slope: fit.slope,
            intercept: fit.intercept,
            r_squared: fit.r_squared,
            t_statistic: fit.t_statistic,
            direction,
            confidence: TrendConfidence::from_r_squared(fit.r_squared),
        }
    }

    fn insufficient(slope: f64, intercept: f64) -> Self {
        Self {
            slope,
            intercept,
            r_squared: 0.0,
            t_statistic: None,
            direction: TrendDirection::Stable,
            confidence: TrendConfidence::Unknown,
        }
    }
}

fn strictly_monotonic(series: &[f64]) -> bool {
    series.len() >= 2
        && (series.windows(2).all(|w| w[1] > w[0]) || series.windows(2).all(|w| w[1] < w[0]))
}

/// One 7-day bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekBin {
    pub week_start: DateTime<Utc>,
    pub commits: usize,
    /// Distinct contributors.
    pub authors: usize,
    pub lines_changed: u64,
}

/// Velocity trend figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityTrendReport {
    /// Commits per week.
    pub commit_trend: Trend,
    /// Distinct authors per week.
    pub author_trend: Trend,
    /// Lines changed per week.
    pub churn_trend: Trend,
    /// Oldest week first.
    pub weekly_counts: Vec<WeekBin>,
    /// Commit trend extrapolated one week, never negative.
    pub predicted_next_week: Option<f64>,
    pub non_empty_weeks: usize,
    pub weeks_lookback: u32,
}

impl VelocityTrendReport {
    /// Bin `commits` into `weeks` bins ending at `as_of`.
    ///
    /// # Errors
    ///
    /// Returns [`gitvitals_core::VitalsError::InvalidOption`] if `weeks` or
    /// `min_t_statistic` is outside its domain or the window leaves the
    /// representable time range.
    pub fn from_commits(
        commits: &[Commit],
        as_of: DateTime<Utc>,
        weeks: u32,
        min_t_statistic: f64,
    ) -> Result<Self> {
        VelocityTrendOptions {
            weeks_lookback: weeks,
            min_t_statistic,
        }
        .validate()?;
        let start = window_start(as_of, weeks)?;
        let mut bins: Vec<(usize, BTreeSet<Contributor>, u64)> =
            vec![(0, BTreeSet::new(), 0); weeks as usize];

        for commit in commits {
            if commit.timestamp < start || commit.timestamp > as_of {
                continue;
            }
            let offset = (commit.timestamp - start).num_seconds() / Duration::weeks(1).num_seconds();
            let index = (offset.max(0) as usize).min(bins.len().saturating_sub(1));
            if let Some(bin) = bins.get_mut(index) {
                bin.0 += 1;
                bin.1.insert(commit.contributor());
                bin.2 += commit.lines_changed();
            }
        }

        let weekly_counts: Vec<WeekBin> = bins
            .into_iter()
            .enumerate()
            .map(|(i, (commits, authors, lines))| WeekBin {
                week_start: start + Duration::weeks(i as i64),
                commits,
                authors: authors.len(),
                lines_changed: lines,
            })
            .collect();
        let non_empty_weeks = weekly_counts.iter().filter(|w| w.commits > 0).count();

        let series = |f: fn(&WeekBin) -> f64| -> Vec<f64> { weekly_counts.iter().map(f).collect() };
        let commit_series = series(|w| w.commits as f64);
        let commit_trend = Trend::fit(&commit_series, non_empty_weeks, min_t_statistic);
        let author_trend = Trend::fit(&series(|w| w.authors as f64), non_empty_weeks, min_t_statistic);
        let churn_trend = Trend::fit(
            &series(|w| w.lines_changed as f64),
            non_empty_weeks,
            min_t_statistic,
        );
        let predicted_next_week = linear_regression(&commit_series)
            .map(|fit| fit.predict(commit_series.len() as f64).max(0.0));

        Ok(Self {
            commit_trend,
            author_trend,
            churn_trend,
            weekly_counts,
            predicted_next_week,
            non_empty_weeks,
            weeks_lookback: weeks,
        })
    }

    pub fn risk_level(&self) -> RiskLevel {
        let trend = &self.commit_trend;
        match (trend.confidence, trend.direction) {
            (TrendConfidence::Unknown, _) => RiskLevel::Unknown,
            (TrendConfidence::High, TrendDirection::Decreasing) => RiskLevel::High,
            (_, TrendDirection::Decreasing) => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

fn window_start(as_of: DateTime<Utc>, weeks: u32) -> Result<DateTime<Utc>> {
    days_before(as_of, 7 * i64::from(weeks), "velocity_trend.weeks_lookback")
}

/// Fits weekly commit, author and churn series.
pub struct VelocityTrendAnalyzer<'a> {
    feed: &'a dyn HistoryFeed,
}

impl<'a> VelocityTrendAnalyzer<'a> {
    pub fn new(feed: &'a dyn HistoryFeed) -> Self {
        Self { feed }
    }
}

impl MetricAnalyzer for VelocityTrendAnalyzer<'_> {
    fn kind(&self) -> MetricKind {
        MetricKind::VelocityTrend
    }

    fn calculate(&self, config: &MetricsConfig, as_of: DateTime<Utc>) -> Result<AnalysisResult> {
        let options = &config.velocity_trend;
        options.validate()?;

        let since = window_start(as_of, options.weeks_lookback)?;
        let commits = self.feed.list_commits(since, as_of)?;
        let report = VelocityTrendReport::from_commits(
            &commits,
            as_of,
            options.weeks_lookback,
            options.min_t_statistic,
        )?;
        debug!(
            weeks = report.weekly_counts.len(),
            active = report.non_empty_weeks,
            direction = %report.commit_trend.direction,
            "velocity trend"
        );
        let risk_level = report.risk_level();

        Ok(AnalysisResult {
            metric: self.kind(),
            as_of,
            risk_level,
            recommendations: recommend(&report),
            report: MetricReport::VelocityTrend(report),
        })
    }

    fn recommendations(&self, result: &AnalysisResult) -> Vec<String> {
        match &result.report {
            MetricReport::VelocityTrend(report) => recommend(report),
            _ => Vec::new(),
        }
    }
}

fn recommend(report: &VelocityTrendReport) -> Vec<String> {
    let trend = &report.commit_trend;
    if trend.confidence == TrendConfidence::Unknown {
        return vec![format!(
            "Only {} of the last {} weeks had commits; at least {MIN_ACTIVE_WEEKS} are needed to judge a trend",
            report.non_empty_weeks, report.weeks_lookback
        )];
    }

    let mut recs = match trend.direction {
        TrendDirection::Decreasing => vec![
            format!(
                "Commit velocity is falling by {:.1} commits per week",
                trend.slope.abs()
            ),
            "Check for blockers, growing review queues or people stretched across projects".into(),
        ],
        TrendDirection::Increasing => vec![format!(
            "Commit velocity is rising by {:.1} commits per week; watch that quality keeps pace",
            trend.slope
        )],
        TrendDirection::Stable => vec!["Commit velocity is steady".into()],
    };

    if report.author_trend.direction == TrendDirection::Decreasing {
        recs.push("Fewer people are committing each week; check team availability".into());
    }
    if trend.confidence == TrendConfidence::Low {
        recs.push("Weekly counts are noisy; treat the trend as a rough signal".into());
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures::{as_of, make_commit};
    use gitvitals_history::MemoryHistory;

    /// `counts[i]` commits in week `i` of a `counts.len()`-week window.
    fn weekly(counts: &[usize]) -> Vec<Commit> {
        let weeks = counts.len() as f64;
        let mut commits = Vec::new();
        for (week, count) in counts.iter().enumerate() {
            for j in 0..*count {
                let days = 7.0 * (weeks - week as f64) - 1.0 - 0.1 * j as f64;
                commits.push(make_commit("dev", days, vec![("a.rs", 1, 0)]));
            }
        }
        commits
    }

    fn report(counts: &[usize]) -> VelocityTrendReport {
        VelocityTrendReport::from_commits(&weekly(counts), as_of(), counts.len() as u32, 2.0)
            .unwrap()
    }

    #[test]
    fn bins_count_commits_per_week() {
        let report = report(&[1, 0, 3, 2]);
        let counts: Vec<usize> = report.weekly_counts.iter().map(|w| w.commits).collect();
        assert_eq!(counts, vec![1, 0, 3, 2]);
        assert_eq!(report.non_empty_weeks, 3);
        assert_eq!(report.weekly_counts[2].authors, 1);
        assert_eq!(report.weekly_counts[2].lines_changed, 3);
        assert_eq!(report.weekly_counts[0].week_start, as_of() - Duration::weeks(4));
    }

    #[test]
    fn commit_at_as_of_lands_in_last_week() {
        let commits = vec![make_commit("dev", 0.0, vec![("a.rs", 1, 0)])];
        let report = VelocityTrendReport::from_commits(&commits, as_of(), 3, 2.0).unwrap();
        assert_eq!(report.weekly_counts[2].commits, 1);
    }

    #[test]
    fn strictly_increasing_series_is_increasing() {
        let report = report(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(report.commit_trend.direction, TrendDirection::Increasing);
        assert_eq!(report.commit_trend.confidence, TrendConfidence::High);
        assert!((report.commit_trend.slope - 1.0).abs() < 1e-9);
        assert!((report.predicted_next_week.unwrap() - 7.0).abs() < 1e-9);
        // one author every week
        assert_eq!(report.author_trend.direction, TrendDirection::Stable);
        assert_eq!(report.churn_trend.direction, TrendDirection::Increasing);
        assert_eq!(report.risk_level(), RiskLevel::Low);
    }

    #[test]
    fn accelerating_increase_is_increasing() {
        let trend = Trend::fit(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0], 6, 2.0);
        assert!(trend.t_statistic.unwrap() < 2.0);
        assert_eq!(trend.direction, TrendDirection::Increasing);

        let report = report(&[1, 2, 3, 4, 5, 40]);
        assert_eq!(report.commit_trend.direction, TrendDirection::Increasing);
        assert_eq!(report.risk_level(), RiskLevel::Low);
    }

    #[test]
    fn sharp_drop_is_decreasing() {
        let trend = Trend::fit(&[100.0, 5.0, 4.0, 3.0, 2.0, 1.0], 6, 2.0);
        assert_eq!(trend.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn falling_series_is_high_risk() {
        let report = report(&[6, 5, 4, 3, 2, 1]);
        assert_eq!(report.commit_trend.direction, TrendDirection::Decreasing);
        assert_eq!(report.risk_level(), RiskLevel::High);
        assert!(report.predicted_next_week.unwrap().abs() < 1e-9);
    }

    #[test]
    fn constant_series_is_stable() {
        let report = report(&[2, 2, 2, 2, 2, 2]);
        assert_eq!(report.commit_trend.direction, TrendDirection::Stable);
        assert_eq!(report.risk_level(), RiskLevel::Low);
    }

    #[test]
    fn noisy_series_without_significance_is_stable() {
        let report = report(&[5, 2, 6, 1, 5, 3]);
        assert_eq!(report.commit_trend.direction, TrendDirection::Stable);
        assert_eq!(report.commit_trend.confidence, TrendConfidence::Low);
    }

    #[test]
    fn few_active_weeks_is_unknown() {
        let report = report(&[0, 0, 1, 0, 4, 9]);
        assert_eq!(report.commit_trend.confidence, TrendConfidence::Unknown);
        assert_eq!(report.commit_trend.direction, TrendDirection::Stable);
        assert_eq!(report.risk_level(), RiskLevel::Unknown);
    }

    #[test]
    fn analyzer_honours_weeks_lookback() {
        let feed = MemoryHistory::new().with_commits(weekly(&[1, 2, 3, 4, 5, 6]));
        let mut config = MetricsConfig::default();
        config.velocity_trend.weeks_lookback = 6;
        let result = VelocityTrendAnalyzer::new(&feed)
            .calculate(&config, as_of())
            .unwrap();
        let MetricReport::VelocityTrend(report) = &result.report else {
            panic!("wrong report");
        };
        assert_eq!(report.weekly_counts.len(), 6);
        assert!(result.recommendations[0].contains("rising"));
    }

    #[test]
    fn oversized_window_is_rejected_before_binning() {
        let err = VelocityTrendReport::from_commits(&[], as_of(), u32::MAX, 2.0).unwrap_err();
        assert!(err.to_string().contains("velocity_trend.weeks_lookback"));

        let feed = MemoryHistory::new();
        let mut config = MetricsConfig::default();
        config.velocity_trend.weeks_lookback = 1_000_000;
        assert!(VelocityTrendAnalyzer::new(&feed)
            .calculate(&config, as_of())
            .is_err());
    }

    #[test]
    fn window_reaching_past_the_earliest_instant_is_an_error() {
        let feed = MemoryHistory::new();
        let earliest = DateTime::<Utc>::MIN_UTC + Duration::days(3);
        let err = VelocityTrendAnalyzer::new(&feed)
            .calculate(&MetricsConfig::default(), earliest)
            .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn empty_history_explains_unknown() {
        let feed = MemoryHistory::new();
        let result = VelocityTrendAnalyzer::new(&feed)
            .calculate(&MetricsConfig::default(), as_of())
            .unwrap();
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert!(result.recommendations[0].contains("0 of the last 12 weeks"));
    }
}
