//! Metric names and the analyzer constructor table.

use std::fmt;
use std::str::FromStr;

use gitvitals_core::VitalsError;
use gitvitals_history::HistoryFeed;
use serde::{Deserialize, Serialize};

use crate::analyzer::MetricAnalyzer;
use crate::analyzers::{
    BranchLifecycleAnalyzer, BusFactorAnalyzer, CriticalFileAnalyzer, CycleTimeAnalyzer,
    FlowEfficiencyAnalyzer, KnowledgeDistributionAnalyzer, SinglePointOfFailureAnalyzer,
    VelocityTrendAnalyzer,
};

/// Every metric the registry knows about.
///
/// # Examples
///
/// ```
/// use gitvitals_metrics::MetricKind;
///
/// let kind: MetricKind = "bus_factor".parse().unwrap();
/// assert_eq!(kind, MetricKind::BusFactor);
/// assert_eq!(kind.to_string(), "bus_factor");
/// assert!("spof".parse::<MetricKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Minimum contributors holding most of the knowledge.
    BusFactor,
    /// Gini coefficient of knowledge per contributor.
    KnowledgeDistribution,
    /// Files that are complex and change often.
    CriticalFiles,
    /// Files dominated by one contributor.
    SinglePointOfFailure,
    /// Active versus elapsed time per branch.
    FlowEfficiency,
    /// Phase durations per branch.
    BranchLifecycle,
    /// Trend of weekly commit counts.
    VelocityTrend,
    /// Distribution of first-commit-to-merge latency.
    CycleTime,
}

impl MetricKind {
    /// Every metric, in display order.
    pub const ALL: [MetricKind; 8] = [
        MetricKind::BusFactor,
        MetricKind::KnowledgeDistribution,
        MetricKind::CriticalFiles,
        MetricKind::SinglePointOfFailure,
        MetricKind::FlowEfficiency,
        MetricKind::BranchLifecycle,
        MetricKind::VelocityTrend,
        MetricKind::CycleTime,
    ];

    /// Registry name, as accepted by `--metric`.
    pub fn name(self) -> &'static str {
        match self {
            MetricKind::BusFactor => "bus_factor",
            MetricKind::KnowledgeDistribution => "knowledge_distribution",
            MetricKind::CriticalFiles => "critical_files",
            MetricKind::SinglePointOfFailure => "single_point_of_failure",
            MetricKind::FlowEfficiency => "flow_efficiency",
            MetricKind::BranchLifecycle => "branch_lifecycle",
            MetricKind::VelocityTrend => "velocity_trend",
            MetricKind::CycleTime => "cycle_time",
        }
    }

    /// Human-readable title.
    pub fn title(self) -> &'static str {
        match self {
            MetricKind::BusFactor => "Bus Factor",
            MetricKind::KnowledgeDistribution => "Knowledge Distribution",
            MetricKind::CriticalFiles => "Critical Files",
            MetricKind::SinglePointOfFailure => "Single Points of Failure",
            MetricKind::FlowEfficiency => "Flow Efficiency",
            MetricKind::BranchLifecycle => "Branch Lifecycle",
            MetricKind::VelocityTrend => "Velocity Trend",
            MetricKind::CycleTime => "Cycle Time",
        }
    }

    /// One-line description of what the metric measures.
    pub fn description(self) -> &'static str {
        match self {
            MetricKind::BusFactor => {
                "Smallest set of contributors holding most of the recency-weighted knowledge"
            }
            MetricKind::KnowledgeDistribution => {
                "How unequally knowledge is spread across contributors (Gini coefficient)"
            }
            MetricKind::CriticalFiles => {
                "Files that are both complex and frequently changed"
            }
            MetricKind::SinglePointOfFailure => {
                "Files where one contributor holds nearly all of the knowledge"
            }
            MetricKind::FlowEfficiency => {
                "Share of a branch's elapsed time that saw active commits"
            }
            MetricKind::BranchLifecycle => {
                "Time from branch creation to first commit, through development, to merge"
            }
            MetricKind::VelocityTrend => {
                "Whether weekly commit activity is rising, falling or stable"
            }
            MetricKind::CycleTime => {
                "Distribution of first-commit-to-merge latency for delivered branches"
            }
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = VitalsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| VitalsError::UnknownMetric {
                name: s.to_string(),
                available: available_metrics().join(", "),
            })
    }
}

type Constructor = for<'a> fn(&'a dyn HistoryFeed) -> Box<dyn MetricAnalyzer + 'a>;

const CONSTRUCTORS: [(MetricKind, Constructor); 8] = [
    (MetricKind::BusFactor, bus_factor),
    (MetricKind::KnowledgeDistribution, knowledge_distribution),
    (MetricKind::CriticalFiles, critical_files),
    (MetricKind::SinglePointOfFailure, single_point_of_failure),
    (MetricKind::FlowEfficiency, flow_efficiency),
    (MetricKind::BranchLifecycle, branch_lifecycle),
    (MetricKind::VelocityTrend, velocity_trend),
    (MetricKind::CycleTime, cycle_time),
];

fn bus_factor<'a>(feed: &'a dyn HistoryFeed) -> Box<dyn MetricAnalyzer + 'a> {
    Box::new(BusFactorAnalyzer::new(feed))
}

fn knowledge_distribution<'a>(feed: &'a dyn HistoryFeed) -> Box<dyn MetricAnalyzer + 'a> {
    Box::new(KnowledgeDistributionAnalyzer::new(feed))
}

fn critical_files<'a>(feed: &'a dyn HistoryFeed) -> Box<dyn MetricAnalyzer + 'a> {
    Box::new(CriticalFileAnalyzer::new(feed))
}

fn single_point_of_failure<'a>(feed: &'a dyn HistoryFeed) -> Box<dyn MetricAnalyzer + 'a> {
    Box::new(SinglePointOfFailureAnalyzer::new(feed))
}

fn flow_efficiency<'a>(feed: &'a dyn HistoryFeed) -> Box<dyn MetricAnalyzer + 'a> {
    Box::new(FlowEfficiencyAnalyzer::new(feed))
}

fn branch_lifecycle<'a>(feed: &'a dyn HistoryFeed) -> Box<dyn MetricAnalyzer + 'a> {
    Box::new(BranchLifecycleAnalyzer::new(feed))
}

fn velocity_trend<'a>(feed: &'a dyn HistoryFeed) -> Box<dyn MetricAnalyzer + 'a> {
    Box::new(VelocityTrendAnalyzer::new(feed))
}

fn cycle_time<'a>(feed: &'a dyn HistoryFeed) -> Box<dyn MetricAnalyzer + 'a> {
    Box::new(CycleTimeAnalyzer::new(feed))
}

/// Build the analyzer for `kind` over `feed`.
///
/// # Examples
///
/// ```
/// use gitvitals_history::MemoryHistory;
/// use gitvitals_metrics::{create_analyzer, MetricKind};
///
/// let feed = MemoryHistory::new();
/// let analyzer = create_analyzer(MetricKind::CycleTime, &feed);
/// assert_eq!(analyzer.kind(), MetricKind::CycleTime);
/// ```
pub fn create_analyzer(kind: MetricKind, feed: &dyn HistoryFeed) -> Box<dyn MetricAnalyzer + '_> {
    // table rows follow declaration order
    let (_, constructor) = CONSTRUCTORS[kind as usize];
    constructor(feed)
}

/// Registry names of every metric, in display order.
///
/// # Examples
///
/// ```
/// let names = gitvitals_metrics::available_metrics();
/// assert_eq!(names.len(), 8);
/// assert_eq!(names[0], "bus_factor");
/// ```
pub fn available_metrics() -> Vec<&'static str> {
    CONSTRUCTORS.iter().map(|(kind, _)| kind.name()).collect()
}
