//! Repository-health metrics over a [`gitvitals_history::HistoryFeed`].
//!
//! Eight analyzers share the [`MetricAnalyzer`] trait and are created by
//! name through the [`registry`]:
//!
//! - knowledge risk: bus factor, knowledge distribution, critical files,
//!   single points of failure (built on [`KnowledgeModel`])
//! - delivery flow: flow efficiency, branch lifecycle, velocity trend,
//!   cycle time
//!
//! Every `calculate` call takes an explicit `as_of` instant and never reads
//! the clock, so identical inputs give identical results.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use gitvitals_core::{MetricsConfig, RiskLevel};
//! use gitvitals_history::MemoryHistory;
//! use gitvitals_metrics::{available_metrics, create_analyzer};
//!
//! let feed = MemoryHistory::new();
//! let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
//! for name in available_metrics() {
//!     let analyzer = create_analyzer(name.parse().unwrap(), &feed);
//!     let result = analyzer.calculate(&MetricsConfig::default(), as_of).unwrap();
//!     assert_eq!(result.risk_level, RiskLevel::Unknown);
//! }
//! ```

pub mod analyzer;
pub mod analyzers;
pub mod cache;
pub mod knowledge;
pub mod registry;
pub mod result;
pub mod stats;

pub use analyzer::MetricAnalyzer;
pub use cache::ResultCache;
pub use knowledge::{KnowledgeModel, KnowledgeWeight};
pub use registry::{available_metrics, create_analyzer, MetricKind};
pub use result::{AnalysisResult, MetricReport};
