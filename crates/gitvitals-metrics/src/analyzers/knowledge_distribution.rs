//! Knowledge distribution: how unequally recent knowledge is spread, as a
//! Gini coefficient over per-contributor totals.

use std::fmt;

use chrono::{DateTime, Utc};
use gitvitals_core::{MetricsConfig, Result, RiskLevel};
use gitvitals_history::HistoryFeed;
use serde::{Deserialize, Serialize};

use super::ContributorShare;
use crate::analyzer::{window_start, MetricAnalyzer};
use crate::knowledge::KnowledgeModel;
use crate::registry::MetricKind;
use crate::result::{AnalysisResult, MetricReport};
use crate::stats::gini;

/// Qualitative band of a Gini coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionQuality {
    /// G < 0.3.
    Excellent,
    /// 0.3 ≤ G < 0.5.
    Good,
    /// 0.5 ≤ G < 0.6.
    Acceptable,
    /// 0.6 ≤ G < 0.8.
    Concerning,
    /// G ≥ 0.8.
    Critical,
    /// Fewer than two contributors; inequality is undefined.
    Unknown,
}

impl DistributionQuality {
    /// Band for a Gini coefficient.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitvitals_metrics::analyzers::DistributionQuality;
    ///
    /// assert_eq!(DistributionQuality::from_gini(0.1), DistributionQuality::Excellent);
    /// assert_eq!(DistributionQuality::from_gini(0.55), DistributionQuality::Acceptable);
    /// assert_eq!(DistributionQuality::from_gini(0.8), DistributionQuality::Critical);
    /// ```
    pub fn from_gini(g: f64) -> Self {
        if g < 0.3 {
            DistributionQuality::Excellent
        } else if g < 0.5 {
            DistributionQuality::Good
        } else if g < 0.6 {
            DistributionQuality::Acceptable
        } else if g < 0.8 {
            DistributionQuality::Concerning
        } else {
            DistributionQuality::Critical
        }
    }

    /// Risk implied by the band.
    pub fn risk_level(self) -> RiskLevel {
        match self {
            DistributionQuality::Excellent | DistributionQuality::Good => RiskLevel::Low,
            DistributionQuality::Acceptable => RiskLevel::Medium,
            DistributionQuality::Concerning => RiskLevel::High,
            DistributionQuality::Critical => RiskLevel::Critical,
            DistributionQuality::Unknown => RiskLevel::Unknown,
        }
    }
}

impl fmt::Display for DistributionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DistributionQuality::Excellent => "excellent",
            DistributionQuality::Good => "good",
            DistributionQuality::Acceptable => "acceptable",
            DistributionQuality::Concerning => "concerning",
            DistributionQuality::Critical => "critical",
            DistributionQuality::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Knowledge distribution figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeDistributionReport {
    /// Gini coefficient in `[0, 1]`; 0 is perfectly even.
    pub gini_coefficient: f64,
    /// Band of the coefficient.
    pub distribution_quality: DistributionQuality,
    /// Every contributor's share, largest first.
    pub per_contributor_share: Vec<ContributorShare>,
    /// Share held by the largest contributor.
    pub top_contributor_share: f64,
    /// Share held by the three largest contributors.
    pub top3_share: f64,
    /// Share held by the smaller half of contributors.
    pub bottom_half_share: f64,
    /// Contributors with any knowledge in the window.
    pub total_contributors: usize,
    /// Window length in 30-day months.
    pub lookback_months: u32,
}

impl KnowledgeDistributionReport {
    /// Summarize the per-contributor totals of `model`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitvitals_history::Contributor;
    /// use gitvitals_metrics::analyzers::KnowledgeDistributionReport;
    /// use gitvitals_metrics::KnowledgeModel;
    ///
    /// let model = KnowledgeModel::from_weights(vec![
    ///     (Contributor::from("a"), "x".to_string(), 1.0),
    ///     (Contributor::from("b"), "x".to_string(), 9.0),
    /// ]);
    /// let report = KnowledgeDistributionReport::from_model(&model, 6);
    /// assert!((report.gini_coefficient - 0.4).abs() < 1e-12);
    /// ```
    pub fn from_model(model: &KnowledgeModel, lookback_months: u32) -> Self {
        let ranked = model.ranked_contributors();
        let total: f64 = ranked.iter().map(|(_, w)| w).sum();
        let n = ranked.len();

        let per_contributor_share: Vec<ContributorShare> = ranked
            .into_iter()
            .map(|(contributor, knowledge)| ContributorShare {
                share: if total > 0.0 { knowledge / total } else { 0.0 },
                contributor,
                knowledge,
            })
            .collect();

        let weights: Vec<f64> = per_contributor_share.iter().map(|c| c.knowledge).collect();
        let degenerate = n <= 1 || total <= 0.0;
        let gini_coefficient = if degenerate { 0.0 } else { gini(&weights) };
        let distribution_quality = if degenerate {
            DistributionQuality::Unknown
        } else {
            DistributionQuality::from_gini(gini_coefficient)
        };

        let top_share = |k: usize| -> f64 {
            per_contributor_share.iter().take(k).map(|c| c.share).sum()
        };
        let top_contributor_share = top_share(1);
        let top3_share = top_share(3);
        let bottom_half_share: f64 = per_contributor_share
            .iter()
            .rev()
            .take(n / 2)
            .map(|c| c.share)
            .sum();

        Self {
            gini_coefficient,
            distribution_quality,
            per_contributor_share,
            top_contributor_share,
            top3_share,
            bottom_half_share,
            total_contributors: n,
            lookback_months,
        }
    }
}

/// Computes the Gini coefficient of knowledge over a lookback window.
pub struct KnowledgeDistributionAnalyzer<'a> {
    feed: &'a dyn HistoryFeed,
}

impl<'a> KnowledgeDistributionAnalyzer<'a> {
    /// Analyzer reading history from `feed`.
    pub fn new(feed: &'a dyn HistoryFeed) -> Self {
        Self { feed }
    }
}

impl MetricAnalyzer for KnowledgeDistributionAnalyzer<'_> {
    fn kind(&self) -> MetricKind {
        MetricKind::KnowledgeDistribution
    }

    fn calculate(&self, config: &MetricsConfig, as_of: DateTime<Utc>) -> Result<AnalysisResult> {
        let options = &config.knowledge_distribution;
        options.validate()?;

        let since =
            window_start(as_of, options.lookback_months, "knowledge_distribution.lookback_months")?;
        let commits = self.feed.list_commits(since, as_of)?;
        let model = KnowledgeModel::build(&commits, as_of, options.decay_half_life_days, self.feed);
        let report = KnowledgeDistributionReport::from_model(&model, options.lookback_months);
        let risk_level = report.distribution_quality.risk_level();

        Ok(AnalysisResult {
            metric: self.kind(),
            as_of,
            risk_level,
            recommendations: recommend(&report),
            report: MetricReport::KnowledgeDistribution(report),
        })
    }

    fn recommendations(&self, result: &AnalysisResult) -> Vec<String> {
        match &result.report {
            MetricReport::KnowledgeDistribution(report) => recommend(report),
            _ => Vec::new(),
        }
    }
}

fn recommend(report: &KnowledgeDistributionReport) -> Vec<String> {
    let mut recs: Vec<String> = match report.distribution_quality {
        DistributionQuality::Unknown => {
            return vec![if report.total_contributors == 0 {
                format!(
                    "No contributions in the last {} months; inequality cannot be measured",
                    report.lookback_months
                )
            } else {
                "Only one contributor in the window; inequality needs at least two people to compare".into()
            }];
        }
        DistributionQuality::Critical => vec![
            "CRITICAL: knowledge is extremely concentrated; start cross-training immediately".into(),
            "Require a second reviewer from outside the owning group on critical components".into(),
            "Document every system that only one person understands".into(),
        ],
        DistributionQuality::Concerning => vec![
            "Knowledge spread is concerning; increase collaboration across areas".into(),
            "Hold regular knowledge-sharing sessions".into(),
            "Route code reviews to people outside the usual owners".into(),
        ],
        DistributionQuality::Acceptable => vec![
            "Knowledge spread is acceptable but could improve".into(),
            "Rotate development responsibilities more often".into(),
        ],
        DistributionQuality::Good => vec![
            "Good knowledge distribution; keep encouraging collaborative development".into(),
        ],
        DistributionQuality::Excellent => {
            vec!["Excellent knowledge distribution across the team".into()]
        }
    };

    if report.top_contributor_share > 0.5 {
        if let Some(top) = report.per_contributor_share.first() {
            recs.push(format!(
                "{} holds {:.0}% of recent knowledge",
                top.contributor,
                top.share * 100.0
            ));
        }
    }

    recs
}
