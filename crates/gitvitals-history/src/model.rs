//! Immutable history records shared by feeds and analyzers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A commit as read from a history feed.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gitvitals_history::Commit;
///
/// let commit = Commit {
///     hash: "abc123".into(),
///     author: "Alice".into(),
///     email: "Alice@Example.com".into(),
///     timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
///     message: "fix: auth bug".into(),
///     files_changed: vec![],
/// };
/// assert_eq!(commit.contributor().as_str(), "alice@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Short commit hash.
    pub hash: String,
    /// Author name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// First line of the commit message.
    pub message: String,
    /// Files modified in this commit.
    pub files_changed: Vec<FileChange>,
}

impl Commit {
    /// Identity key of the commit author.
    pub fn contributor(&self) -> Contributor {
        Contributor::from_identity(&self.author, &self.email)
    }

    /// Lines added plus lines deleted across every file.
    pub fn lines_changed(&self) -> u64 {
        self.files_changed
            .iter()
            .map(|f| f.lines_added + f.lines_deleted)
            .sum()
    }
}

/// A single file change within a commit.
///
/// # Examples
///
/// ```
/// use gitvitals_history::{ChangeStatus, FileChange};
///
/// let change = FileChange {
///     path: "assets/logo.png".into(),
///     lines_added: 0,
///     lines_deleted: 0,
///     status: ChangeStatus::Modified,
/// };
/// // a touch without a textual diff still counts as one line
/// assert_eq!(change.lines_touched(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// File path relative to repo root.
    pub path: String,
    /// Lines added in this commit.
    pub lines_added: u64,
    /// Lines deleted in this commit.
    pub lines_deleted: u64,
    /// Type of change.
    pub status: ChangeStatus,
}

impl FileChange {
    /// Lines added plus deleted, never less than one.
    pub fn lines_touched(&self) -> u64 {
        (self.lines_added + self.lines_deleted).max(1)
    }
}

/// Status of a file change within a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ChangeStatus {
    /// New file.
    Added,
    /// Existing file modified.
    Modified,
    /// File removed.
    Deleted,
    /// File renamed from another path.
    Renamed {
        /// Original path before rename.
        from: String,
    },
}

/// Stable identity of a contributor.
///
/// Derived from the author's email (lowercased) when present, otherwise
/// from the trimmed author name, so the same person committing under
/// differently-cased emails is counted once. Ordering is lexical and is
/// used to break ties deterministically.
///
/// # Examples
///
/// ```
/// use gitvitals_history::Contributor;
///
/// let a = Contributor::from_identity("Bob", " BOB@example.com ");
/// let b = Contributor::from_identity("bob", "bob@example.com");
/// assert_eq!(a, b);
///
/// let anonymous = Contributor::from_identity("carol", "");
/// assert_eq!(anonymous.as_str(), "carol");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contributor(String);

impl Contributor {
    /// Build the identity key from an author name and email.
    pub fn from_identity(name: &str, email: &str) -> Self {
        let email = email.trim();
        if email.is_empty() || email == "unknown" {
            Self(name.trim().to_string())
        } else {
            Self(email.to_lowercase())
        }
    }

    /// The identity key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Contributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Contributor {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// A unit of work tracked as a branch.
///
/// `commits` holds the commits unique to the branch, oldest first.
/// Open branches have no `merged_at`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gitvitals_history::Branch;
///
/// let branch = Branch {
///     name: "feature/login".into(),
///     created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
///     merged_at: None,
///     commits: vec![],
/// };
/// assert!(!branch.is_merged());
/// assert!(branch.first_commit_at().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Branch name without any remote prefix.
    pub name: String,
    /// When the branch was created.
    pub created_at: DateTime<Utc>,
    /// When the branch was merged or closed.
    pub merged_at: Option<DateTime<Utc>>,
    /// Commits unique to the branch, oldest first.
    pub commits: Vec<Commit>,
}

impl Branch {
    /// Time of the earliest commit on the branch.
    pub fn first_commit_at(&self) -> Option<DateTime<Utc>> {
        self.commits.iter().map(|c| c.timestamp).min()
    }

    /// Time of the latest commit on the branch.
    pub fn last_commit_at(&self) -> Option<DateTime<Utc>> {
        self.commits.iter().map(|c| c.timestamp).max()
    }

    /// Whether the branch has been merged or closed.
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn commit(hash: &str, timestamp: DateTime<Utc>, files: Vec<(&str, u64, u64)>) -> Commit {
        Commit {
            hash: hash.into(),
            author: "alice".into(),
            email: "alice@example.com".into(),
            timestamp,
            message: "test".into(),
            files_changed: files
                .into_iter()
                .map(|(path, added, deleted)| FileChange {
                    path: path.into(),
                    lines_added: added,
                    lines_deleted: deleted,
                    status: ChangeStatus::Modified,
                })
                .collect(),
        }
    }

    #[test]
    fn contributor_prefers_email_and_ignores_case() {
        let a = Contributor::from_identity("Alice", "ALICE@example.com");
        let b = Contributor::from_identity("alice smith", "alice@example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn contributor_falls_back_to_name() {
        assert_eq!(
            Contributor::from_identity(" dave ", "unknown").as_str(),
            "dave"
        );
    }

    #[test]
    fn lines_changed_sums_files() {
        let c = commit("a", at(1, 0), vec![("a.rs", 10, 2), ("b.rs", 0, 5)]);
        assert_eq!(c.lines_changed(), 17);
    }

    #[test]
    fn branch_commit_bounds_ignore_list_order() {
        let branch = Branch {
            name: "feature/x".into(),
            created_at: at(1, 0),
            merged_at: Some(at(9, 0)),
            commits: vec![
                commit("b", at(4, 0), vec![]),
                commit("a", at(2, 0), vec![]),
                commit("c", at(7, 0), vec![]),
            ],
        };
        assert_eq!(branch.first_commit_at(), Some(at(2, 0)));
        assert_eq!(branch.last_commit_at(), Some(at(7, 0)));
        assert!(branch.is_merged());
    }

    #[test]
    fn change_status_serializes_with_kind_tag() {
        let renamed = ChangeStatus::Renamed {
            from: "old.rs".into(),
        };
        let json = serde_json::to_value(&renamed).unwrap();
        assert_eq!(json["kind"], "renamed");
        assert_eq!(json["from"], "old.rs");
    }
}
