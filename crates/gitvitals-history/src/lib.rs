//! History feeds: where commits and branches come from.
//!
//! Defines the [`HistoryFeed`] trait consumed by the analyzers, the
//! immutable data model it produces, and two implementations: a git2-backed
//! [`GitHistory`] that mines a local repository and an in-memory
//! [`MemoryHistory`] snapshot.

pub mod feed;
pub mod filter;
pub mod git;
pub mod memory;
pub mod model;
pub mod signals;

pub use feed::HistoryFeed;
pub use filter::BranchFilter;
pub use git::GitHistory;
pub use memory::MemoryHistory;
pub use model::{Branch, ChangeStatus, Commit, Contributor, FileChange};
