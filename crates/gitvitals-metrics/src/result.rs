use chrono::{DateTime, Utc};
use gitvitals_core::RiskLevel;
use serde::{Deserialize, Serialize};

use crate::analyzers::{
    BranchLifecycleReport, BusFactorReport, CriticalFileReport, CycleTimeReport,
    FlowEfficiencyReport, KnowledgeDistributionReport, SinglePointOfFailureReport,
    VelocityTrendReport,
};
use crate::registry::MetricKind;

/// The outcome of one `calculate` call.
///
/// Serializes to JSON with camelCase keys; the report is keyed by its
/// metric, e.g. `{"report": {"busFactor": {...}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Metric that produced this result.
    pub metric: MetricKind,
    /// Instant the analysis was computed for.
    pub as_of: DateTime<Utc>,
    /// Overall risk.
    pub risk_level: RiskLevel,
    /// Metric-specific figures.
    pub report: MetricReport,
    /// Suggested actions, most urgent first.
    pub recommendations: Vec<String>,
}

/// Metric-specific report, one variant per analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricReport {
    /// See [`BusFactorReport`].
    BusFactor(BusFactorReport),
    /// See [`KnowledgeDistributionReport`].
    KnowledgeDistribution(KnowledgeDistributionReport),
    /// See [`CriticalFileReport`].
    CriticalFiles(CriticalFileReport),
    /// See [`SinglePointOfFailureReport`].
    SinglePointOfFailure(SinglePointOfFailureReport),
    /// See [`FlowEfficiencyReport`].
    FlowEfficiency(FlowEfficiencyReport),
    /// See [`BranchLifecycleReport`].
    BranchLifecycle(BranchLifecycleReport),
    /// See [`VelocityTrendReport`].
    VelocityTrend(VelocityTrendReport),
    /// See [`CycleTimeReport`].
    CycleTime(CycleTimeReport),
}

impl MetricReport {
    /// Metric the report belongs to.
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricReport::BusFactor(_) => MetricKind::BusFactor,
            MetricReport::KnowledgeDistribution(_) => MetricKind::KnowledgeDistribution,
            MetricReport::CriticalFiles(_) => MetricKind::CriticalFiles,
            MetricReport::SinglePointOfFailure(_) => MetricKind::SinglePointOfFailure,
            MetricReport::FlowEfficiency(_) => MetricKind::FlowEfficiency,
            MetricReport::BranchLifecycle(_) => MetricKind::BranchLifecycle,
            MetricReport::VelocityTrend(_) => MetricKind::VelocityTrend,
            MetricReport::CycleTime(_) => MetricKind::CycleTime,
        }
    }
}
