//! Bus factor: the smallest group of contributors whose departure would
//! take most of the recent knowledge with them.

use chrono::{DateTime, Utc};
use gitvitals_core::{MetricsConfig, Result, RiskLevel};
use gitvitals_history::HistoryFeed;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ContributorShare;
use crate::analyzer::{window_start, MetricAnalyzer};
use crate::knowledge::KnowledgeModel;
use crate::registry::MetricKind;
use crate::result::{AnalysisResult, MetricReport};

/// Slack for float summation when comparing coverage to the threshold.
const COVERAGE_TOLERANCE: f64 = 1e-12;

/// Bus factor figures.
///
/// # Examples
///
/// ```
/// use gitvitals_history::Contributor;
/// use gitvitals_metrics::analyzers::BusFactorReport;
/// use gitvitals_metrics::KnowledgeModel;
///
/// let model = KnowledgeModel::from_weights(vec![
///     (Contributor::from("alice"), "a.rs".to_string(), 5.0),
///     (Contributor::from("bob"), "b.rs".to_string(), 3.0),
///     (Contributor::from("carol"), "c.rs".to_string(), 2.0),
/// ]);
/// let report = BusFactorReport::from_model(&model, 0.8, 6);
/// assert_eq!(report.bus_factor, 2);
/// assert_eq!(report.covering_contributors[0].contributor.as_str(), "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusFactorReport {
    /// Size of the covering set.
    pub bus_factor: usize,
    /// Contributors in the covering set, most knowledgeable first.
    pub covering_contributors: Vec<ContributorShare>,
    /// Cumulative share after adding each covering contributor.
    pub coverage_path: Vec<f64>,
    /// Contributors with any knowledge in the window.
    pub total_contributors: usize,
    /// Sum of every knowledge weight in the window.
    pub total_knowledge: f64,
    /// Share the covering set had to reach.
    pub knowledge_threshold: f64,
    /// Window length in 30-day months.
    pub lookback_months: u32,
}

impl BusFactorReport {
    /// Greedy minimum covering set over `model`.
    ///
    /// Contributors are taken in descending order of total knowledge (ties
    /// by identity) until their cumulative share reaches `threshold`.
    pub fn from_model(model: &KnowledgeModel, threshold: f64, lookback_months: u32) -> Self {
        let total = model.total_knowledge();
        let mut covering = Vec::new();
        let mut coverage_path = Vec::new();

        if total > 0.0 {
            let mut cumulative = 0.0;
            for (contributor, knowledge) in model.ranked_contributors() {
                cumulative += knowledge;
                let share = knowledge / total;
                covering.push(ContributorShare {
                    contributor,
                    knowledge,
                    share,
                });
                let coverage = (cumulative / total).min(1.0);
                coverage_path.push(coverage);
                if coverage + COVERAGE_TOLERANCE >= threshold {
                    break;
                }
            }
        }

        Self {
            bus_factor: covering.len(),
            covering_contributors: covering,
            coverage_path,
            total_contributors: model.contributor_count(),
            total_knowledge: total,
            knowledge_threshold: threshold,
            lookback_months,
        }
    }

    /// Risk band for this report.
    pub fn risk_level(&self) -> RiskLevel {
        if self.total_knowledge <= 0.0 {
            return RiskLevel::Unknown;
        }
        match self.bus_factor {
            0 | 1 => RiskLevel::Critical,
            2 => RiskLevel::High,
            3 | 4 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// Computes the bus factor over a lookback window.
pub struct BusFactorAnalyzer<'a> {
    feed: &'a dyn HistoryFeed,
}

impl<'a> BusFactorAnalyzer<'a> {
    /// Analyzer reading history from `feed`.
    pub fn new(feed: &'a dyn HistoryFeed) -> Self {
        Self { feed }
    }
}

impl MetricAnalyzer for BusFactorAnalyzer<'_> {
    fn kind(&self) -> MetricKind {
        MetricKind::BusFactor
    }

    fn calculate(&self, config: &MetricsConfig, as_of: DateTime<Utc>) -> Result<AnalysisResult> {
        let options = &config.bus_factor;
        options.validate()?;

        let since = window_start(as_of, options.lookback_months, "bus_factor.lookback_months")?;
        let commits = self.feed.list_commits(since, as_of)?;
        debug!(commits = commits.len(), %since, %as_of, "bus factor window");

        let model = KnowledgeModel::build(&commits, as_of, options.decay_half_life_days, self.feed);
        let report = BusFactorReport::from_model(
            &model,
            options.knowledge_threshold,
            options.lookback_months,
        );
        let risk_level = report.risk_level();

        Ok(AnalysisResult {
            metric: self.kind(),
            as_of,
            risk_level,
            recommendations: recommend(&report, risk_level),
            report: MetricReport::BusFactor(report),
        })
    }

    fn recommendations(&self, result: &AnalysisResult) -> Vec<String> {
        match &result.report {
            MetricReport::BusFactor(report) => recommend(report, result.risk_level),
            _ => Vec::new(),
        }
    }
}

fn recommend(report: &BusFactorReport, risk: RiskLevel) -> Vec<String> {
    let mut recs: Vec<String> = match risk {
        RiskLevel::Unknown => {
            return vec![format!(
                "No contributions found in the last {} months; widen the lookback window to measure the bus factor",
                report.lookback_months
            )];
        }
        RiskLevel::Critical => vec![
            "URGENT: one person holds most of the recent knowledge; schedule knowledge transfer now".into(),
            "Document the components only they have worked on".into(),
            "Pair on every change to those components until someone else can own them".into(),
        ],
        RiskLevel::High => vec![
            "Spread code review across more of the team".into(),
            "Rotate ownership of the busiest areas between developers".into(),
            "Write down the business rules that live only in people's heads".into(),
        ],
        RiskLevel::Medium => vec![
            "Keep up current knowledge-sharing habits and watch for concentration".into(),
            "Onboard newer team members onto the most-changed components".into(),
        ],
        RiskLevel::Low => vec!["Knowledge is well spread; keep current practices".into()],
    };

    if !report.covering_contributors.is_empty() {
        let names: Vec<&str> = report
            .covering_contributors
            .iter()
            .map(|c| c.contributor.as_str())
            .collect();
        let coverage = report.coverage_path.last().copied().unwrap_or(0.0);
        recs.push(format!(
            "Losing {} would take {:.0}% of recent knowledge with them",
            names.join(", "),
            coverage * 100.0
        ));
    }

    if report.total_contributors > 0
        && (report.bus_factor as f64) / (report.total_contributors as f64) < 0.3
    {
        recs.push(format!(
            "Only {} of {} contributors hold most of the knowledge; spread it more evenly",
            report.bus_factor, report.total_contributors
        ));
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures::{as_of, make_commit};
    use gitvitals_history::{Contributor, MemoryHistory};

    fn model(weights: &[(&str, f64)]) -> KnowledgeModel {
        KnowledgeModel::from_weights(
            weights
                .iter()
                .map(|(who, w)| (Contributor::from(*who), format!("{who}.rs"), *w)),
        )
    }

    #[test]
    fn two_contributors_cover_eighty_percent() {
        let report = BusFactorReport::from_model(&model(&[("a", 0.5), ("b", 0.3), ("c", 0.2)]), 0.8, 6);
        assert_eq!(report.bus_factor, 2);
        let names: Vec<&str> = report
            .covering_contributors
            .iter()
            .map(|c| c.contributor.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(report.risk_level(), RiskLevel::High);
        assert_eq!(report.coverage_path.len(), 2);
    }

    #[test]
    fn single_owner_is_critical() {
        let report = BusFactorReport::from_model(&model(&[("solo", 10.0)]), 0.8, 6);
        assert_eq!(report.bus_factor, 1);
        assert_eq!(report.risk_level(), RiskLevel::Critical);
    }

    #[test]
    fn even_team_of_six_is_low_risk() {
        let weights: Vec<(&str, f64)> = ["a", "b", "c", "d", "e", "f"]
            .into_iter()
            .map(|n| (n, 1.0))
            .collect();
        let report = BusFactorReport::from_model(&model(&weights), 0.8, 6);
        // 5/6 is the first cumulative share at or above 0.8
        assert_eq!(report.bus_factor, 5);
        assert_eq!(report.risk_level(), RiskLevel::Low);
    }

    #[test]
    fn threshold_of_one_needs_everyone_with_knowledge() {
        let report = BusFactorReport::from_model(&model(&[("a", 3.0), ("b", 1.0), ("c", 1.0)]), 1.0, 6);
        assert_eq!(report.bus_factor, 3);
        assert!((report.coverage_path[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ties_break_by_identity() {
        let report = BusFactorReport::from_model(&model(&[("zed", 1.0), ("amy", 1.0)]), 0.5, 6);
        assert_eq!(report.bus_factor, 1);
        assert_eq!(report.covering_contributors[0].contributor.as_str(), "amy");
    }

    #[test]
    fn empty_history_is_unknown_with_explanation() {
        let feed = MemoryHistory::new();
        let analyzer = BusFactorAnalyzer::new(&feed);
        let result = analyzer
            .calculate(&MetricsConfig::default(), as_of())
            .unwrap();
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        match &result.report {
            MetricReport::BusFactor(r) => assert_eq!(r.bus_factor, 0),
            other => panic!("unexpected report {other:?}"),
        }
        assert_eq!(result.recommendations.len(), 1);
        assert!(result.recommendations[0].contains("6 months"));
    }

    #[test]
    fn commits_outside_window_are_ignored() {
        let feed = MemoryHistory::new().with_commits(vec![
            make_commit("alice", 10.0, vec![("a.rs", 10, 0)]),
            make_commit("bob", 400.0, vec![("b.rs", 1000, 0)]),
        ]);
        let result = BusFactorAnalyzer::new(&feed)
            .calculate(&MetricsConfig::default(), as_of())
            .unwrap();
        let MetricReport::BusFactor(report) = &result.report else {
            panic!("wrong report");
        };
        assert_eq!(report.total_contributors, 1);
        assert_eq!(report.bus_factor, 1);
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn recommendations_name_covering_contributors() {
        let feed = MemoryHistory::new().with_commits(vec![
            make_commit("alice", 1.0, vec![("a.rs", 80, 0)]),
            make_commit("bob", 1.0, vec![("b.rs", 15, 0)]),
            make_commit("carol", 1.0, vec![("c.rs", 5, 0)]),
        ]);
        let analyzer = BusFactorAnalyzer::new(&feed);
        let result = analyzer
            .calculate(&MetricsConfig::default(), as_of())
            .unwrap();
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("alice@example.com")));
        assert_eq!(analyzer.recommendations(&result), result.recommendations);
    }

    #[test]
    fn invalid_threshold_is_rejected_before_reading_history() {
        let feed = MemoryHistory::new();
        let mut config = MetricsConfig::default();
        config.bus_factor.knowledge_threshold = 0.0;
        let err = BusFactorAnalyzer::new(&feed)
            .calculate(&config, as_of())
            .unwrap_err();
        assert!(matches!(
            err,
            gitvitals_core::VitalsError::InvalidOption { .. }
        ));
    }
}
