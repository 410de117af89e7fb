//! Files whose knowledge sits with one dominant contributor.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gitvitals_core::{MetricsConfig, Result, RiskLevel, SinglePointOfFailureOptions};
use gitvitals_history::{Contributor, HistoryFeed};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzer::{window_start, MetricAnalyzer};
use crate::knowledge::{sanitize_factor, KnowledgeModel};
use crate::registry::MetricKind;
use crate::result::{AnalysisResult, MetricReport};

/// Whether a file with the given top share and contributor count is a
/// single point of failure.
///
/// The share must strictly exceed the dominance threshold and the
/// contributor count must not exceed the configured maximum.
///
/// # Examples
///
/// ```
/// use gitvitals_core::SinglePointOfFailureOptions;
/// use gitvitals_metrics::analyzers::is_single_point_of_failure;
///
/// let opts = SinglePointOfFailureOptions::default();
/// assert!(is_single_point_of_failure(0.9, 2, &opts));
/// assert!(!is_single_point_of_failure(0.8, 1, &opts));
/// assert!(!is_single_point_of_failure(0.95, 3, &opts));
/// ```
pub fn is_single_point_of_failure(
    max_share: f64,
    contributor_count: usize,
    options: &SinglePointOfFailureOptions,
) -> bool {
    max_share > options.dominance_threshold && contributor_count <= options.max_contributors
}

/// A flagged file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpofFile {
    pub path: String,
    pub dominant_contributor: Contributor,
    /// Dominant contributor's share of the file's knowledge.
    pub share: f64,
    /// Contributors with nonzero weight on the file.
    pub contributor_count: usize,
    /// Criticality factor above 1.0.
    pub high_criticality: bool,
    pub criticality: f64,
}

/// A contributor dominating more than one flagged file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dominator {
    pub contributor: Contributor,
    pub files: Vec<String>,
}

/// Single-point-of-failure figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinglePointOfFailureReport {
    /// Flagged files, high criticality first, then by share.
    pub spof_files: Vec<SpofFile>,
    /// Contributors dominating two or more flagged files.
    pub multi_file_dominators: Vec<Dominator>,
    /// Files with nonzero knowledge in the window.
    pub files_analyzed: usize,
    pub high_criticality_count: usize,
    pub dominance_threshold: f64,
    pub max_contributors: usize,
    pub lookback_months: u32,
}

impl SinglePointOfFailureReport {
    /// Flag files in `model`; `criticality` returns a path's factor.
    pub fn from_model(
        model: &KnowledgeModel,
        options: &SinglePointOfFailureOptions,
        criticality: impl Fn(&str) -> f64,
    ) -> Self {
        let shares = model.file_shares();
        let mut flagged = Vec::new();

        for (path, row) in &shares {
            let nonzero: Vec<&(Contributor, f64)> = row.iter().filter(|(_, s)| *s > 0.0).collect();
            let Some((dominant, share)) = nonzero.first() else {
                continue;
            };
            if !is_single_point_of_failure(*share, nonzero.len(), options) {
                continue;
            }
            let factor = criticality(path);
            flagged.push(SpofFile {
                path: path.clone(),
                dominant_contributor: dominant.clone(),
                share: *share,
                contributor_count: nonzero.len(),
                high_criticality: factor > 1.0,
                criticality: factor,
            });
        }

        flagged.sort_by(|a, b| {
            b.high_criticality
                .cmp(&a.high_criticality)
                .then_with(|| b.share.total_cmp(&a.share))
                .then_with(|| a.path.cmp(&b.path))
        });

        let mut by_owner: BTreeMap<&Contributor, Vec<String>> = BTreeMap::new();
        for file in &flagged {
            by_owner
                .entry(&file.dominant_contributor)
                .or_default()
                .push(file.path.clone());
        }
        let multi_file_dominators = by_owner
            .into_iter()
            .filter(|(_, files)| files.len() >= 2)
            .map(|(contributor, mut files)| {
                files.sort();
                Dominator {
                    contributor: contributor.clone(),
                    files,
                }
            })
            .collect();

        let high_criticality_count = flagged.iter().filter(|f| f.high_criticality).count();
        Self {
            spof_files: flagged,
            multi_file_dominators,
            files_analyzed: shares.len(),
            high_criticality_count,
            dominance_threshold: options.dominance_threshold,
            max_contributors: options.max_contributors,
            lookback_months: options.lookback_months,
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        if self.files_analyzed == 0 {
            return RiskLevel::Unknown;
        }
        let high = self.high_criticality_count;
        let flagged = self.spof_files.len();
        if high > 5 || flagged > 20 {
            RiskLevel::Critical
        } else if high > 2 || flagged > 10 {
            RiskLevel::High
        } else if high > 0 || flagged > 5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Flags files dominated by a single contributor.
pub struct SinglePointOfFailureAnalyzer<'a> {
    feed: &'a dyn HistoryFeed,
}

impl<'a> SinglePointOfFailureAnalyzer<'a> {
    pub fn new(feed: &'a dyn HistoryFeed) -> Self {
        Self { feed }
    }
}

impl MetricAnalyzer for SinglePointOfFailureAnalyzer<'_> {
    fn kind(&self) -> MetricKind {
        MetricKind::SinglePointOfFailure
    }

    fn calculate(&self, config: &MetricsConfig, as_of: DateTime<Utc>) -> Result<AnalysisResult> {
        let options = &config.single_point_of_failure;
        options.validate()?;

        let since =
            window_start(as_of, options.lookback_months, "single_point_of_failure.lookback_months")?;
        let commits = self.feed.list_commits(since, as_of)?;
        let model = KnowledgeModel::build(&commits, as_of, options.decay_half_life_days, self.feed);
        let report = SinglePointOfFailureReport::from_model(&model, options, |path| {
            sanitize_factor("criticality", path, self.feed.criticality(path))
        });
        debug!(
            flagged = report.spof_files.len(),
            files = report.files_analyzed,
            "single points of failure"
        );
        let risk_level = report.risk_level();

        Ok(AnalysisResult {
            metric: self.kind(),
            as_of,
            risk_level,
            recommendations: recommend(&report),
            report: MetricReport::SinglePointOfFailure(report),
        })
    }

    fn recommendations(&self, result: &AnalysisResult) -> Vec<String> {
        match &result.report {
            MetricReport::SinglePointOfFailure(report) => recommend(report),
            _ => Vec::new(),
        }
    }
}

fn recommend(report: &SinglePointOfFailureReport) -> Vec<String> {
    if report.files_analyzed == 0 {
        return vec![format!(
            "No contributions found in the last {} months; nothing to check for single points of failure",
            report.lookback_months
        )];
    }
    if report.spof_files.is_empty() {
        return vec!["No single points of failure found; ownership is shared".into()];
    }

    let mut recs = Vec::new();
    if report.high_criticality_count > 0 {
        recs.push(format!(
            "{} critical files depend on one person; cross-train on these first",
            report.high_criticality_count
        ));
    }
    for dominator in report.multi_file_dominators.iter().take(3) {
        recs.push(format!(
            "{} is the sole expert on {} files; pair them with another developer",
            dominator.contributor,
            dominator.files.len()
        ));
    }
    let top: Vec<&str> = report
        .spof_files
        .iter()
        .take(5)
        .map(|f| f.path.as_str())
        .collect();
    recs.push(format!("Spread ownership of: {}", top.join(", ")));
    recs.push("Require reviews from someone other than the main author on flagged files".into());
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures::{as_of, make_commit};
    use gitvitals_history::MemoryHistory;

    fn cell(who: &str, path: &str, w: f64) -> (Contributor, String, f64) {
        (Contributor::from(who), path.to_string(), w)
    }

    #[test]
    fn dominated_file_is_flagged() {
        let model = KnowledgeModel::from_weights(vec![
            cell("alice", "core.rs", 9.0),
            cell("bob", "core.rs", 1.0),
            cell("alice", "shared.rs", 5.0),
            cell("bob", "shared.rs", 5.0),
        ]);
        let report = SinglePointOfFailureReport::from_model(
            &model,
            &SinglePointOfFailureOptions::default(),
            |_| 1.0,
        );
        assert_eq!(report.files_analyzed, 2);
        assert_eq!(report.spof_files.len(), 1);
        let file = &report.spof_files[0];
        assert_eq!(file.path, "core.rs");
        assert_eq!(file.dominant_contributor.as_str(), "alice");
        assert!((file.share - 0.9).abs() < 1e-12);
        assert_eq!(file.contributor_count, 2);
        assert!(!file.high_criticality);
        assert_eq!(report.risk_level(), RiskLevel::Low);
    }

    #[test]
    fn share_at_threshold_is_not_flagged() {
        let model = KnowledgeModel::from_weights(vec![
            cell("alice", "a.rs", 4.0),
            cell("bob", "a.rs", 1.0),
        ]);
        let report = SinglePointOfFailureReport::from_model(
            &model,
            &SinglePointOfFailureOptions::default(),
            |_| 1.0,
        );
        assert!(report.spof_files.is_empty());
    }

    #[test]
    fn too_many_contributors_is_not_flagged() {
        let model = KnowledgeModel::from_weights(vec![
            cell("alice", "a.rs", 90.0),
            cell("bob", "a.rs", 5.0),
            cell("carol", "a.rs", 5.0),
        ]);
        let report = SinglePointOfFailureReport::from_model(
            &model,
            &SinglePointOfFailureOptions::default(),
            |_| 1.0,
        );
        assert!(report.spof_files.is_empty());
    }

    #[test]
    fn critical_files_sort_first_and_raise_risk() {
        let model = KnowledgeModel::from_weights(vec![
            cell("alice", "docs.md", 10.0),
            cell("alice", "main.rs", 5.0),
            cell("bob", "main.rs", 1.0),
        ]);
        let report = SinglePointOfFailureReport::from_model(
            &model,
            &SinglePointOfFailureOptions::default(),
            |path| if path == "main.rs" { 1.5 } else { 1.0 },
        );
        assert_eq!(report.spof_files[0].path, "main.rs");
        assert!(report.spof_files[0].high_criticality);
        assert_eq!(report.high_criticality_count, 1);
        assert_eq!(report.risk_level(), RiskLevel::Medium);
        assert_eq!(report.multi_file_dominators.len(), 1);
        assert_eq!(
            report.multi_file_dominators[0].files,
            vec!["docs.md".to_string(), "main.rs".to_string()]
        );
    }

    #[test]
    fn risk_thresholds() {
        let mut weights = Vec::new();
        for i in 0..11 {
            weights.push(cell("alice", &format!("f{i}.rs"), 1.0));
        }
        let model = KnowledgeModel::from_weights(weights);
        let report = SinglePointOfFailureReport::from_model(
            &model,
            &SinglePointOfFailureOptions::default(),
            |_| 1.0,
        );
        assert_eq!(report.spof_files.len(), 11);
        assert_eq!(report.risk_level(), RiskLevel::High);
    }

    /// xorshift64, enough randomness for a boundary check without a crate.
    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x
        }

        fn below(&mut self, n: u64) -> u64 {
            self.next() % n
        }
    }

    #[test]
    fn flag_boundary_holds_across_random_matrices() {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
        for round in 0..200 {
            let options = SinglePointOfFailureOptions {
                dominance_threshold: 0.5 + rng.below(50) as f64 / 100.0,
                max_contributors: 1 + rng.below(3) as usize,
                ..SinglePointOfFailureOptions::default()
            };
            let mut cells = Vec::new();
            for file in 0..(1 + rng.below(6)) {
                for who in 0..(1 + rng.below(4)) {
                    // zero weights exercise the nonzero-count rule
                    let weight = rng.below(20) as f64;
                    cells.push(cell(&format!("dev{who}"), &format!("f{file}.rs"), weight));
                }
            }
            let model = KnowledgeModel::from_weights(cells);
            let report = SinglePointOfFailureReport::from_model(&model, &options, |_| 1.0);

            for (path, row) in model.file_shares() {
                let nonzero: Vec<f64> = row.iter().map(|(_, s)| *s).filter(|s| *s > 0.0).collect();
                let max = nonzero.iter().copied().fold(0.0, f64::max);
                let expected = max > options.dominance_threshold
                    && nonzero.len() <= options.max_contributors;
                let flagged = report.spof_files.iter().any(|f| f.path == path);
                assert_eq!(flagged, expected, "round {round}, file {path}");
            }
        }
    }

    #[test]
    fn analyzer_uses_feed_criticality() {
        let feed = MemoryHistory::new()
            .with_commits(vec![
                make_commit("alice", 2.0, vec![("src/main.rs", 50, 0)]),
                make_commit("bob", 3.0, vec![("README.md", 5, 0)]),
            ])
            .with_criticality("src/main.rs", 1.5);
        let result = SinglePointOfFailureAnalyzer::new(&feed)
            .calculate(&MetricsConfig::default(), as_of())
            .unwrap();
        let MetricReport::SinglePointOfFailure(report) = &result.report else {
            panic!("wrong report");
        };
        assert_eq!(report.spof_files.len(), 2);
        assert_eq!(report.spof_files[0].path, "src/main.rs");
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(result.recommendations[0].contains("critical files"));
    }

    #[test]
    fn empty_history_is_unknown() {
        let feed = MemoryHistory::new();
        let result = SinglePointOfFailureAnalyzer::new(&feed)
            .calculate(&MetricsConfig::default(), as_of())
            .unwrap();
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert_eq!(result.recommendations.len(), 1);
    }
}
