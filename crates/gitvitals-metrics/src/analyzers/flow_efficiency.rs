//! Flow efficiency: days with commits versus days a branch was in flight.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use gitvitals_core::{MetricsConfig, Result, RiskLevel};
use gitvitals_history::{Branch, HistoryFeed};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{branches_as_of, whole_days};
use crate::analyzer::MetricAnalyzer;
use crate::registry::MetricKind;
use crate::result::{AnalysisResult, MetricReport};
use crate::stats::{mean, median};

const BOTTLENECK_EFFICIENCY: f64 = 0.3;
const BOTTLENECK_FLOW_DAYS: i64 = 7;
const BEST_PRACTICE_EFFICIENCY: f64 = 0.7;
const BEST_PRACTICE_FLOW_DAYS: i64 = 14;

/// Efficiency band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowBand {
    Excellent,
    Good,
    Average,
    Poor,
}

impl FlowBand {
    /// Band for an efficiency in `[0, 1]`.
    pub fn from_efficiency(efficiency: f64) -> Self {
        if efficiency > 0.8 {
            FlowBand::Excellent
        } else if efficiency >= 0.6 {
            FlowBand::Good
        } else if efficiency >= 0.4 {
            FlowBand::Average
        } else {
            FlowBand::Poor
        }
    }

    pub fn risk_level(self) -> RiskLevel {
        match self {
            FlowBand::Excellent | FlowBand::Good => RiskLevel::Low,
            FlowBand::Average => RiskLevel::Medium,
            FlowBand::Poor => RiskLevel::High,
        }
    }
}

impl fmt::Display for FlowBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowBand::Excellent => "excellent",
            FlowBand::Good => "good",
            FlowBand::Average => "average",
            FlowBand::Poor => "poor",
        };
        f.write_str(name)
    }
}

/// Flow figures for one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchFlow {
    pub name: String,
    /// Distinct UTC calendar days with a commit.
    pub active_days: usize,
    /// Whole days from first commit to merge, or to `as_of` while open.
    pub flow_days: i64,
    /// `active_days / flow_days` capped at 1, or 1 when `flow_days` is 0.
    pub efficiency: f64,
    pub band: FlowBand,
    /// Not merged at `as_of`.
    pub in_progress: bool,
    /// Low efficiency over more than a week.
    pub bottleneck: bool,
}

impl BranchFlow {
    /// Measure `branch`; `None` when it has no commits.
    pub fn measure(branch: &Branch, as_of: DateTime<Utc>) -> Option<Self> {
        let first = branch.first_commit_at()?;
        let active_days = branch
            .commits
            .iter()
            .map(|c| c.timestamp.date_naive())
            .collect::<BTreeSet<_>>()
            .len();
        let end = branch.merged_at.unwrap_or(as_of);
        let flow_days = whole_days(first, end);
        let efficiency = if flow_days == 0 {
            1.0
        } else {
            (active_days as f64 / flow_days as f64).min(1.0)
        };

        Some(Self {
            name: branch.name.clone(),
            active_days,
            flow_days,
            efficiency,
            band: FlowBand::from_efficiency(efficiency),
            in_progress: !branch.is_merged(),
            bottleneck: efficiency < BOTTLENECK_EFFICIENCY && flow_days > BOTTLENECK_FLOW_DAYS,
        })
    }
}

/// Branches per band.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandCounts {
    pub excellent: usize,
    pub good: usize,
    pub average: usize,
    pub poor: usize,
}

/// Flow efficiency figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEfficiencyReport {
    /// One entry per measured branch, in feed order.
    pub per_branch_efficiency: Vec<BranchFlow>,
    /// Mean of per-branch efficiencies.
    pub aggregate_efficiency: Option<f64>,
    pub median_efficiency: Option<f64>,
    pub aggregate_band: Option<FlowBand>,
    pub bands: BandCounts,
    /// Bottleneck branches, least efficient first.
    pub bottlenecks: Vec<String>,
    /// Short, dense branches worth copying.
    pub best_practices: Vec<String>,
    pub branch_patterns: Vec<String>,
}

impl FlowEfficiencyReport {
    pub fn from_branches(branches: &[Branch], as_of: DateTime<Utc>, patterns: &[String]) -> Self {
        let flows: Vec<BranchFlow> = branches
            .iter()
            .filter_map(|b| BranchFlow::measure(b, as_of))
            .collect();

        let efficiencies: Vec<f64> = flows.iter().map(|f| f.efficiency).collect();
        let aggregate_efficiency = mean(&efficiencies);
        let mut bands = BandCounts::default();
        for flow in &flows {
            match flow.band {
                FlowBand::Excellent => bands.excellent += 1,
                FlowBand::Good => bands.good += 1,
                FlowBand::Average => bands.average += 1,
                FlowBand::Poor => bands.poor += 1,
            }
        }

        let mut slow: Vec<&BranchFlow> = flows.iter().filter(|f| f.bottleneck).collect();
        slow.sort_by(|a, b| {
            a.efficiency
                .total_cmp(&b.efficiency)
                .then_with(|| a.name.cmp(&b.name))
        });
        let bottlenecks = slow.into_iter().map(|f| f.name.clone()).collect();
        let best_practices = flows
            .iter()
            .filter(|f| {
                f.efficiency > BEST_PRACTICE_EFFICIENCY && f.flow_days <= BEST_PRACTICE_FLOW_DAYS
            })
            .map(|f| f.name.clone())
            .collect();

        Self {
            median_efficiency: median(&efficiencies),
            aggregate_band: aggregate_efficiency.map(FlowBand::from_efficiency),
            aggregate_efficiency,
            per_branch_efficiency: flows,
            bands,
            bottlenecks,
            best_practices,
            branch_patterns: patterns.to_vec(),
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.aggregate_band
            .map_or(RiskLevel::Unknown, FlowBand::risk_level)
    }
}

/// Measures how much of each branch's lifetime saw active work.
pub struct FlowEfficiencyAnalyzer<'a> {
    feed: &'a dyn HistoryFeed,
}

impl<'a> FlowEfficiencyAnalyzer<'a> {
    pub fn new(feed: &'a dyn HistoryFeed) -> Self {
        Self { feed }
    }
}

impl MetricAnalyzer for FlowEfficiencyAnalyzer<'_> {
    fn kind(&self) -> MetricKind {
        MetricKind::FlowEfficiency
    }

    fn calculate(&self, config: &MetricsConfig, as_of: DateTime<Utc>) -> Result<AnalysisResult> {
        let options = &config.flow_efficiency;
        options.validate()?;

        let branches = branches_as_of(self.feed, &options.branch_patterns, as_of)?;
        let report = FlowEfficiencyReport::from_branches(&branches, as_of, &options.branch_patterns);
        debug!(
            branches = report.per_branch_efficiency.len(),
            aggregate = ?report.aggregate_efficiency,
            "flow efficiency"
        );
        let risk_level = report.risk_level();

        Ok(AnalysisResult {
            metric: self.kind(),
            as_of,
            risk_level,
            recommendations: recommend(&report),
            report: MetricReport::FlowEfficiency(report),
        })
    }

    fn recommendations(&self, result: &AnalysisResult) -> Vec<String> {
        match &result.report {
            MetricReport::FlowEfficiency(report) => recommend(report),
            _ => Vec::new(),
        }
    }
}

fn recommend(report: &FlowEfficiencyReport) -> Vec<String> {
    let Some(band) = report.aggregate_band else {
        return vec![format!(
            "No branches match {}; adjust branch_patterns to measure flow efficiency",
            report.branch_patterns.join(", ")
        )];
    };

    let mut recs: Vec<String> = match band {
        FlowBand::Poor => vec![
            "Branches sit idle most of their lifetime; limit work in progress".into(),
            "Break features into smaller pieces that can merge within days".into(),
            "Look for waiting time in review and hand-offs".into(),
        ],
        FlowBand::Average => vec![
            "Flow is average; shorten review queues to cut waiting time".into(),
            "Keep branches small so they merge soon after work stops".into(),
        ],
        FlowBand::Good | FlowBand::Excellent => {
            vec!["Flow efficiency is healthy; keep branches short-lived".into()]
        }
    };

    if !report.bottlenecks.is_empty() {
        let names: Vec<&str> = report
            .bottlenecks
            .iter()
            .take(5)
            .map(String::as_str)
            .collect();
        recs.push(format!(
            "Investigate stalled branches: {}",
            names.join(", ")
        ));
    }
    if !report.best_practices.is_empty() && band != FlowBand::Excellent {
        recs.push(format!(
            "{} branches merged quickly with steady activity; reuse how they were run",
            report.best_practices.len()
        ));
    }
    recs
}
