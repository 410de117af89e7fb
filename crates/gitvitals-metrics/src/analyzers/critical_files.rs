//! Critical files: complexity × change frequency, ranked by percentile.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gitvitals_core::{CriticalFileOptions, MetricsConfig, Result, RiskLevel};
use gitvitals_history::{Commit, HistoryFeed};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzer::{window_start, MetricAnalyzer};
use crate::knowledge::sanitize_factor;
use crate::registry::MetricKind;
use crate::result::{AnalysisResult, MetricReport};
use crate::stats::min_max_normalize;

/// A scored file.
///
/// # Examples
///
/// ```
/// use gitvitals_core::RiskLevel;
/// use gitvitals_metrics::analyzers::CriticalFile;
///
/// let file = CriticalFile {
///     path: "src/engine.rs".into(),
///     risk_score: 0.92,
///     category: RiskLevel::Critical,
///     complexity: 840.0,
///     change_frequency: 31,
///     percentile: 0.97,
/// };
/// assert!(file.risk_score <= 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalFile {
    /// File path relative to repo root.
    pub path: String,
    /// Normalized complexity × normalized change frequency, in `[0, 1]`.
    pub risk_score: f64,
    /// Category from the percentile cut lines.
    pub category: RiskLevel,
    /// Complexity signal from the feed (1.0 when absent).
    pub complexity: f64,
    /// Commits in the window touching the file.
    pub change_frequency: usize,
    /// Fraction of the other files with a strictly lower score; 1.0 for a
    /// file that outscores every other one.
    pub percentile: f64,
}

/// Files per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCounts {
    /// CRITICAL files.
    pub critical: usize,
    /// HIGH files.
    pub high: usize,
    /// MEDIUM files.
    pub medium: usize,
    /// LOW files.
    pub low: usize,
}

/// Critical file figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalFileReport {
    /// Every file in scope, highest score first (ties by path).
    pub critical_files: Vec<CriticalFile>,
    /// Files per category.
    pub category_counts: CategoryCounts,
    /// Files touched in the window.
    pub total_files_analyzed: usize,
    /// Highest score, 0 with no files.
    pub max_risk_score: f64,
    /// Window length in 30-day months.
    pub lookback_months: u32,
}

impl CriticalFileReport {
    /// Score every file touched by `commits`.
    ///
    /// `complexity` supplies the raw complexity of a path.
    pub fn from_commits(
        commits: &[Commit],
        options: &CriticalFileOptions,
        complexity: impl Fn(&str) -> f64,
    ) -> Self {
        let mut frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for commit in commits {
            for file in &commit.files_changed {
                *frequency.entry(file.path.as_str()).or_default() += 1;
            }
        }

        let paths: Vec<&str> = frequency.keys().copied().collect();
        let complexities: Vec<f64> = paths.iter().map(|p| complexity(p)).collect();
        let frequencies: Vec<f64> = paths.iter().map(|p| frequency[p] as f64).collect();
        let norm_complexity = min_max_normalize(&complexities);
        let norm_frequency = min_max_normalize(&frequencies);
        let scores: Vec<f64> = norm_complexity
            .iter()
            .zip(&norm_frequency)
            .map(|(c, f)| c * f)
            .collect();

        let n = paths.len();
        let top_score = scores.iter().copied().fold(0.0, f64::max);
        let mut counts = CategoryCounts::default();
        let mut files: Vec<CriticalFile> = paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let score = scores[i];
                let lower = scores.iter().filter(|s| **s < score).count();
                let percentile = if n > 1 {
                    lower as f64 / (n - 1) as f64
                } else {
                    1.0
                };
                let category = if score > 0.0 && score >= top_score {
                    RiskLevel::Critical
                } else {
                    categorize(score, percentile, options)
                };
                match category {
                    RiskLevel::Critical => counts.critical += 1,
                    RiskLevel::High => counts.high += 1,
                    RiskLevel::Medium => counts.medium += 1,
                    _ => counts.low += 1,
                }
                CriticalFile {
                    path: (*path).to_string(),
                    risk_score: score,
                    category,
                    complexity: complexities[i],
                    change_frequency: frequency[path],
                    percentile,
                }
            })
            .collect();

        files.sort_by(|a, b| {
            b.risk_score
                .total_cmp(&a.risk_score)
                .then_with(|| a.path.cmp(&b.path))
        });
        let max_risk_score = files.first().map_or(0.0, |f| f.risk_score);

        Self {
            critical_files: files,
            category_counts: counts,
            total_files_analyzed: n,
            max_risk_score,
            lookback_months: options.lookback_months,
        }
    }

    /// Overall risk, driven by the highest score.
    pub fn risk_level(&self) -> RiskLevel {
        if self.total_files_analyzed == 0 {
            return RiskLevel::Unknown;
        }
        let max = self.max_risk_score;
        if max >= 0.8 {
            RiskLevel::Critical
        } else if max >= 0.5 {
            RiskLevel::High
        } else if max >= 0.2 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

fn categorize(score: f64, percentile: f64, options: &CriticalFileOptions) -> RiskLevel {
    if score <= 0.0 {
        RiskLevel::Low
    } else if percentile >= options.critical_percentile {
        RiskLevel::Critical
    } else if percentile >= options.high_percentile {
        RiskLevel::High
    } else if percentile >= options.medium_percentile {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Ranks files by complexity and change frequency over a lookback window.
pub struct CriticalFileAnalyzer<'a> {
    feed: &'a dyn HistoryFeed,
}

impl<'a> CriticalFileAnalyzer<'a> {
    /// Analyzer reading history from `feed`.
    pub fn new(feed: &'a dyn HistoryFeed) -> Self {
        Self { feed }
    }
}

impl MetricAnalyzer for CriticalFileAnalyzer<'_> {
    fn kind(&self) -> MetricKind {
        MetricKind::CriticalFiles
    }

    fn calculate(&self, config: &MetricsConfig, as_of: DateTime<Utc>) -> Result<AnalysisResult> {
        let options = &config.critical_files;
        options.validate()?;

        let since = window_start(as_of, options.lookback_months, "critical_files.lookback_months")?;
        let commits = self.feed.list_commits(since, as_of)?;
        let report = CriticalFileReport::from_commits(&commits, options, |path| {
            sanitize_factor("complexity", path, self.feed.complexity(path))
        });
        debug!(files = report.total_files_analyzed, "scored files");
        let risk_level = report.risk_level();

        Ok(AnalysisResult {
            metric: self.kind(),
            as_of,
            risk_level,
            recommendations: recommend(&report),
            report: MetricReport::CriticalFiles(report),
        })
    }

    fn recommendations(&self, result: &AnalysisResult) -> Vec<String> {
        match &result.report {
            MetricReport::CriticalFiles(report) => recommend(report),
            _ => Vec::new(),
        }
    }
}

fn recommend(report: &CriticalFileReport) -> Vec<String> {
    if report.total_files_analyzed == 0 {
        return vec![format!(
            "No files changed in the last {} months; nothing to score",
            report.lookback_months
        )];
    }

    let critical = report.category_counts.critical;
    if critical == 0 {
        return vec!["No critical files identified; file health looks good".into()];
    }

    let mut recs: Vec<String> = Vec::new();
    let critical_ratio = critical as f64 / report.total_files_analyzed as f64;
    if critical_ratio > 0.2 {
        recs.extend([
            "HIGH RISK: a large share of files is critical".to_string(),
            "Refactor the most complex hot files into smaller units".to_string(),
            "Require thorough review and tests for every change to critical files".to_string(),
        ]);
    } else {
        recs.extend([
            "Watch critical files closely and raise their test coverage".to_string(),
            "Consider splitting complex files that change often".to_string(),
        ]);
    }

    let top: Vec<&str> = report
        .critical_files
        .iter()
        .filter(|f| f.category == RiskLevel::Critical)
        .take(5)
        .map(|f| f.path.as_str())
        .collect();
    recs.push(format!(
        "Focus on the top {} critical files: {}",
        top.len(),
        top.join(", ")
    ));
    recs
}
