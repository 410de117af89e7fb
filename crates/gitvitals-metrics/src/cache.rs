//! Caller-owned memo of analysis results.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use gitvitals_core::{MetricsConfig, Result};
use gitvitals_history::HistoryFeed;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::analyzer::MetricAnalyzer;
use crate::registry::MetricKind;
use crate::result::AnalysisResult;

/// Results keyed by metric, that metric's options, `as_of` and the feed
/// snapshot.
///
/// Changing an option of one analyzer only invalidates that analyzer's
/// entries.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gitvitals_core::MetricsConfig;
/// use gitvitals_history::MemoryHistory;
/// use gitvitals_metrics::{create_analyzer, MetricKind, ResultCache};
///
/// let feed = MemoryHistory::new();
/// let analyzer = create_analyzer(MetricKind::BusFactor, &feed);
/// let config = MetricsConfig::default();
/// let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
///
/// let mut cache = ResultCache::new();
/// let first = cache.get_or_compute(analyzer.as_ref(), &feed, &config, as_of).unwrap();
/// let second = cache.get_or_compute(analyzer.as_ref(), &feed, &config, as_of).unwrap();
/// assert_eq!(first, second);
/// assert_eq!((cache.hits(), cache.misses()), (1, 1));
/// ```
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<String, AnalysisResult>,
    hits: usize,
    misses: usize,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for one invocation.
    ///
    /// # Errors
    ///
    /// Returns [`gitvitals_core::VitalsError::Serialization`] if the options
    /// cannot be serialized.
    pub fn key(
        kind: MetricKind,
        config: &MetricsConfig,
        as_of: DateTime<Utc>,
        snapshot_id: &str,
    ) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(kind.name().as_bytes());
        hasher.update([0]);
        hasher.update(options_json(kind, config)?.as_bytes());
        hasher.update([0]);
        hasher.update(as_of.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
        hasher.update([0]);
        hasher.update(snapshot_id.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Return the cached result or run `analyzer` and remember its output.
    ///
    /// `feed` must be the feed `analyzer` reads from. Errors are not cached.
    pub fn get_or_compute(
        &mut self,
        analyzer: &dyn MetricAnalyzer,
        feed: &dyn HistoryFeed,
        config: &MetricsConfig,
        as_of: DateTime<Utc>,
    ) -> Result<AnalysisResult> {
        let kind = analyzer.kind();
        let key = Self::key(kind, config, as_of, &feed.snapshot_id())?;
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            debug!(metric = %kind, "result cache hit");
            return Ok(hit.clone());
        }

        self.misses += 1;
        let result = analyzer.calculate(config, as_of)?;
        self.entries.insert(key, result.clone());
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// The options section a metric reads, as JSON.
fn options_json(kind: MetricKind, config: &MetricsConfig) -> Result<String> {
    let json = match kind {
        MetricKind::BusFactor => serde_json::to_string(&config.bus_factor)?,
        MetricKind::KnowledgeDistribution => serde_json::to_string(&config.knowledge_distribution)?,
        MetricKind::CriticalFiles => serde_json::to_string(&config.critical_files)?,
        MetricKind::SinglePointOfFailure => serde_json::to_string(&config.single_point_of_failure)?,
        MetricKind::FlowEfficiency => serde_json::to_string(&config.flow_efficiency)?,
        MetricKind::BranchLifecycle => serde_json::to_string(&config.branch_lifecycle)?,
        MetricKind::VelocityTrend => serde_json::to_string(&config.velocity_trend)?,
        MetricKind::CycleTime => serde_json::to_string(&config.cycle_time)?,
    };
    Ok(json)
}
