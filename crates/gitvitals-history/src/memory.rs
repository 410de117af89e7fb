//! A fixed, in-memory history snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gitvitals_core::VitalsError;
use sha2::{Digest, Sha256};

use crate::feed::HistoryFeed;
use crate::filter::BranchFilter;
use crate::model::{Branch, Commit};

/// History held entirely in memory.
///
/// Useful for tests and for replaying exported history. The snapshot id is
/// a content hash, so two snapshots with the same records share an id.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use gitvitals_history::{Commit, HistoryFeed, MemoryHistory};
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
/// let history = MemoryHistory::new().with_commits(vec![Commit {
///     hash: "a1".into(),
///     author: "alice".into(),
///     email: "alice@example.com".into(),
///     timestamp: now - Duration::days(3),
///     message: "init".into(),
///     files_changed: vec![],
/// }]);
///
/// let recent = history.list_commits(now - Duration::days(7), now).unwrap();
/// assert_eq!(recent.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    commits: Vec<Commit>,
    branches: Vec<Branch>,
    complexity: BTreeMap<String, f64>,
    criticality: BTreeMap<String, f64>,
}

impl MemoryHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add commits.
    pub fn with_commits(mut self, commits: impl IntoIterator<Item = Commit>) -> Self {
        self.commits.extend(commits);
        self
    }

    /// Add a single commit.
    pub fn with_commit(mut self, commit: Commit) -> Self {
        self.commits.push(commit);
        self
    }

    /// Add a branch.
    pub fn with_branch(mut self, branch: Branch) -> Self {
        self.branches.push(branch);
        self
    }

    /// Set the complexity signal for a file.
    pub fn with_complexity(mut self, path: impl Into<String>, value: f64) -> Self {
        self.complexity.insert(path.into(), value);
        self
    }

    /// Set the criticality weight for a file.
    pub fn with_criticality(mut self, path: impl Into<String>, value: f64) -> Self {
        self.criticality.insert(path.into(), value);
        self
    }

    /// Every commit in the snapshot, in insertion order.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Every branch in the snapshot, in insertion order.
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }
}

impl HistoryFeed for MemoryHistory {
    fn list_commits(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Commit>, VitalsError> {
        let mut commits: Vec<Commit> = self
            .commits
            .iter()
            .filter(|c| c.timestamp >= since && c.timestamp <= until)
            .cloned()
            .collect();
        commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.hash.cmp(&b.hash)));
        Ok(commits)
    }

    fn list_branches(&self, filter: &BranchFilter) -> Result<Vec<Branch>, VitalsError> {
        Ok(self
            .branches
            .iter()
            .filter(|b| filter.matches(&b.name))
            .cloned()
            .collect())
    }

    fn complexity(&self, path: &str) -> Option<f64> {
        self.complexity.get(path).copied()
    }

    fn criticality(&self, path: &str) -> Option<f64> {
        self.criticality.get(path).copied()
    }

    fn snapshot_id(&self) -> String {
        let mut hasher = Sha256::new();
        for commit in &self.commits {
            hash_commit(&mut hasher, commit);
        }
        for branch in &self.branches {
            hasher.update(b"branch\0");
            hasher.update(branch.name.as_bytes());
            hasher.update(branch.created_at.timestamp().to_le_bytes());
            if let Some(merged) = branch.merged_at {
                hasher.update(merged.timestamp().to_le_bytes());
            }
            for commit in &branch.commits {
                hash_commit(&mut hasher, commit);
            }
        }
        for (label, signals) in [("complexity", &self.complexity), ("criticality", &self.criticality)] {
            hasher.update(label.as_bytes());
            for (path, value) in signals {
                hasher.update(path.as_bytes());
                hasher.update(value.to_le_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

fn hash_commit(hasher: &mut Sha256, commit: &Commit) {
    hasher.update(b"commit\0");
    hasher.update(commit.hash.as_bytes());
    hasher.update(commit.email.as_bytes());
    hasher.update(commit.timestamp.timestamp().to_le_bytes());
    for file in &commit.files_changed {
        hasher.update(file.path.as_bytes());
        hasher.update(file.lines_added.to_le_bytes());
        hasher.update(file.lines_deleted.to_le_bytes());
    }
}
