use chrono::{DateTime, Utc};
use gitvitals_core::VitalsError;

use crate::filter::BranchFilter;
use crate::model::{Branch, Commit};

/// A read-only source of commit and branch history.
///
/// Analyzers only ever see history through this trait, so they run the
/// same against a live repository ([`crate::GitHistory`]) and a fixed
/// snapshot ([`crate::MemoryHistory`]). Implementations must return the
/// same answers for the same arguments for as long as
/// [`snapshot_id`](HistoryFeed::snapshot_id) is unchanged.
pub trait HistoryFeed {
    /// Commits with `since <= timestamp <= until`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::Git`] if the underlying history cannot be read.
    fn list_commits(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Commit>, VitalsError>;

    /// Merged and open branches whose names match `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::Git`] if the underlying history cannot be read.
    fn list_branches(&self, filter: &BranchFilter) -> Result<Vec<Branch>, VitalsError>;

    /// Size or complexity signal for a file; `None` means neutral.
    fn complexity(&self, _path: &str) -> Option<f64> {
        None
    }

    /// Business-criticality weight for a file; `None` means neutral.
    fn criticality(&self, _path: &str) -> Option<f64> {
        None
    }

    /// Identifier that changes whenever the history behind this feed changes.
    fn snapshot_id(&self) -> String;
}
