//! Core types, configuration, and error handling for gitvitals.
//!
//! This crate provides the shared foundation used by all other gitvitals crates:
//! - [`VitalsError`]: unified error type using `thiserror` and `miette`
//! - [`VitalsConfig`]: configuration loaded from `.gitvitals.toml`
//! - Per-analyzer option sets collected in [`MetricsConfig`]
//! - Shared types: [`RiskLevel`], [`OutputFormat`]

mod config;
mod error;
mod options;
mod types;

pub use config::{HistoryConfig, VitalsConfig, DEFAULT_CONFIG_FILE};
pub use error::VitalsError;
pub use options::{
    default_branch_patterns, BranchLifecycleOptions, BusFactorOptions, CriticalFileOptions,
    CycleTimeOptions, FlowEfficiencyOptions, KnowledgeDistributionOptions, MetricsConfig,
    SinglePointOfFailureOptions, VelocityTrendOptions, MAX_LOOKBACK_MONTHS, MAX_WEEKS_LOOKBACK,
};
pub use types::{OutputFormat, RiskLevel};

/// A convenience `Result` type for gitvitals operations.
pub type Result<T> = std::result::Result<T, VitalsError>;
