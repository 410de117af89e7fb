//! Git history extraction via git2.
//!
//! Mines commit history from a repository, extracting per-commit
//! file changes with line counts, author info, and timestamps, and
//! reconstructs work branches from merge commits and open local branches.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use git2::{BranchType, Delta, Diff, DiffOptions, ErrorCode, Oid, Repository, Sort};
use gitvitals_core::{HistoryConfig, VitalsError};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::feed::HistoryFeed;
use crate::filter::BranchFilter;
use crate::model::{Branch, ChangeStatus, Commit, FileChange};
use crate::signals;

/// History read from a local git repository.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use chrono::{Duration, Utc};
/// use gitvitals_core::HistoryConfig;
/// use gitvitals_history::{GitHistory, HistoryFeed};
///
/// let history = GitHistory::open(Path::new("."), &HistoryConfig::default()).unwrap();
/// let now = Utc::now();
/// for c in history.list_commits(now - Duration::days(30), now).unwrap() {
///     println!("{}: {} ({})", c.hash, c.message, c.author);
/// }
/// ```
pub struct GitHistory {
    repo: Repository,
    workdir: Option<PathBuf>,
    options: HistoryConfig,
}

impl GitHistory {
    /// Open the repository at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::Git`] if `path` is not a git repository.
    pub fn open(path: &Path, options: &HistoryConfig) -> Result<Self, VitalsError> {
        let repo = Repository::open(path).map_err(git_err("failed to open repository"))?;
        let workdir = repo.workdir().map(Path::to_path_buf);
        Ok(Self {
            repo,
            workdir,
            options: options.clone(),
        })
    }

    fn head_oid(&self) -> Result<Option<Oid>, VitalsError> {
        match self.repo.head() {
            Ok(head) => Ok(head.target()),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            }
            Err(e) => Err(git_err("failed to resolve HEAD")(e)),
        }
    }

    /// Resolve the integration branch tip: the configured branch, then
    /// `main`, then `master`, then HEAD.
    fn main_tip(&self) -> Result<Option<Oid>, VitalsError> {
        if let Some(name) = &self.options.main_branch {
            let branch = self
                .repo
                .find_branch(name, BranchType::Local)
                .map_err(git_err(&format!("main branch '{name}' not found")))?;
            return Ok(branch.get().target());
        }
        for name in ["main", "master"] {
            if let Ok(branch) = self.repo.find_branch(name, BranchType::Local) {
                if let Some(oid) = branch.get().target() {
                    return Ok(Some(oid));
                }
            }
        }
        self.head_oid()
    }

    fn to_commit(&self, commit: &git2::Commit) -> Result<Commit, VitalsError> {
        let diff = diff_against_first_parent(&self.repo, commit)?;
        let files_changed = extract_file_changes(diff)?;
        Ok(describe(commit, files_changed))
    }

    /// Commits reachable from `tip` but not from `base`, oldest first.
    fn unique_commits(&self, tip: Oid, base: Oid) -> Result<Vec<Commit>, VitalsError> {
        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(git_err("failed to create revwalk"))?;
        revwalk
            .set_sorting(Sort::TIME | Sort::REVERSE)
            .map_err(git_err("failed to sort revwalk"))?;
        revwalk.push(tip).map_err(git_err("failed to push oid"))?;
        revwalk.hide(base).map_err(git_err("failed to hide oid"))?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let oid = oid.map_err(git_err("revwalk error"))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(git_err("failed to find commit"))?;
            commits.push(self.to_commit(&commit)?);
        }
        Ok(commits)
    }

    /// Oldest reflog entry of `refname`, else the fork point with `base`,
    /// never later than the first branch commit.
    fn creation_time(
        &self,
        refname: &str,
        tip: Oid,
        base: Oid,
        commits: &[Commit],
    ) -> DateTime<Utc> {
        let from_reflog = self.repo.reflog(refname).ok().and_then(|reflog| {
            reflog
                .iter()
                .last()
                .map(|entry| to_utc(entry.committer().when().seconds()))
        });
        let created = from_reflog.or_else(|| {
            let fork = self.repo.merge_base(tip, base).ok()?;
            let commit = self.repo.find_commit(fork).ok()?;
            Some(to_utc(commit.time().seconds()))
        });
        let first_commit = commits.iter().map(|c| c.timestamp).min();
        match (created, first_commit) {
            (Some(created), Some(first)) => created.min(first),
            (Some(created), None) => created,
            (None, Some(first)) => first,
            (None, None) => to_utc(0),
        }
    }

    fn merged_branches(
        &self,
        main_tip: Oid,
        filter: &BranchFilter,
        seen: &mut HashSet<String>,
    ) -> Result<Vec<Branch>, VitalsError> {
        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(git_err("failed to create revwalk"))?;
        revwalk
            .set_sorting(Sort::TIME)
            .map_err(git_err("failed to sort revwalk"))?;
        revwalk
            .push(main_tip)
            .map_err(git_err("failed to push oid"))?;
        revwalk
            .simplify_first_parent()
            .map_err(git_err("failed to simplify revwalk"))?;

        let mut branches = Vec::new();
        for oid in revwalk {
            let oid = oid.map_err(git_err("revwalk error"))?;
            let merge = self
                .repo
                .find_commit(oid)
                .map_err(git_err("failed to find commit"))?;
            if merge.parent_count() < 2 {
                continue;
            }
            let Some(name) = merge.summary().and_then(parse_merge_branch_name) else {
                debug!(commit = %oid, "merge without a recognizable branch name");
                continue;
            };
            // a branch merged more than once is measured at its latest merge
            if !filter.matches(&name) || seen.contains(&name) {
                continue;
            }

            let base = merge.parent_id(0).map_err(git_err("failed to read parent"))?;
            let side = merge.parent_id(1).map_err(git_err("failed to read parent"))?;
            let commits = self.unique_commits(side, base)?;
            if commits.is_empty() {
                debug!(branch = %name, "merge brought no new commits");
                continue;
            }

            let created_at =
                self.creation_time(&format!("refs/heads/{name}"), side, base, &commits);
            seen.insert(name.clone());
            branches.push(Branch {
                name,
                created_at,
                merged_at: Some(to_utc(merge.time().seconds())),
                commits,
            });
        }
        Ok(branches)
    }

    fn open_branches(
        &self,
        main_tip: Oid,
        filter: &BranchFilter,
        seen: &mut HashSet<String>,
    ) -> Result<Vec<Branch>, VitalsError> {
        let mut kinds = vec![BranchType::Local];
        if self.options.include_remote_branches {
            kinds.push(BranchType::Remote);
        }

        let mut branches = Vec::new();
        for kind in kinds {
            let iter = self
                .repo
                .branches(Some(kind))
                .map_err(git_err("failed to list branches"))?;
            for item in iter {
                let (branch, _) = item.map_err(git_err("failed to read branch"))?;
                let Some(short) = branch
                    .name()
                    .map_err(git_err("failed to read branch name"))?
                    .map(str::to_string)
                else {
                    continue;
                };
                let name = match kind {
                    BranchType::Remote => match short.split_once('/') {
                        Some((_, rest)) => rest.to_string(),
                        None => continue,
                    },
                    BranchType::Local => short,
                };
                if name == "HEAD" || !filter.matches(&name) || seen.contains(&name) {
                    continue;
                }
                let (Some(tip), Some(refname)) =
                    (branch.get().target(), branch.get().name().map(str::to_string))
                else {
                    continue;
                };

                let merged = tip == main_tip
                    || self
                        .repo
                        .graph_descendant_of(main_tip, tip)
                        .map_err(git_err("failed to compare branches"))?;
                if merged {
                    warn!(branch = %name, "branch merged without a merge commit; skipping");
                    continue;
                }

                let commits = self.unique_commits(tip, main_tip)?;
                if commits.is_empty() {
                    continue;
                }
                let created_at = self.creation_time(&refname, tip, main_tip, &commits);
                seen.insert(name.clone());
                branches.push(Branch {
                    name,
                    created_at,
                    merged_at: None,
                    commits,
                });
            }
        }
        Ok(branches)
    }
}

impl HistoryFeed for GitHistory {
    fn list_commits(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Commit>, VitalsError> {
        let Some(head) = self.head_oid()? else {
            debug!("repository has no commits yet");
            return Ok(Vec::new());
        };

        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(git_err("failed to create revwalk"))?;
        revwalk
            .set_sorting(Sort::TIME)
            .map_err(git_err("failed to sort revwalk"))?;
        revwalk.push(head).map_err(git_err("failed to push HEAD"))?;

        let max_files = self.options.max_files_per_commit;
        let mut commits = Vec::new();
        let mut skipped = 0usize;

        for oid in revwalk {
            let oid = oid.map_err(git_err("revwalk error"))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(git_err("failed to find commit"))?;

            let timestamp = to_utc(commit.time().seconds());
            if timestamp > until {
                continue;
            }
            if timestamp < since {
                break;
            }

            // Skip large refactors and bulk merges before paying for rename detection
            let diff = diff_against_first_parent(&self.repo, &commit)?;
            if diff.deltas().len() > max_files {
                skipped += 1;
                continue;
            }
            let files_changed = extract_file_changes(diff)?;
            if files_changed.len() > max_files {
                skipped += 1;
                continue;
            }

            commits.push(describe(&commit, files_changed));
        }

        debug!(
            commits = commits.len(),
            skipped, "mined commit history"
        );
        Ok(commits)
    }

    fn list_branches(&self, filter: &BranchFilter) -> Result<Vec<Branch>, VitalsError> {
        let Some(main_tip) = self.main_tip()? else {
            return Ok(Vec::new());
        };
        let mut seen = HashSet::new();
        let mut branches = self.merged_branches(main_tip, filter, &mut seen)?;
        branches.extend(self.open_branches(main_tip, filter, &mut seen)?);
        debug!(branches = branches.len(), "reconstructed branches");
        Ok(branches)
    }

    fn complexity(&self, path: &str) -> Option<f64> {
        let workdir = self.workdir.as_ref()?;
        signals::count_lines(&workdir.join(path)).map(|n| n as f64)
    }

    fn criticality(&self, path: &str) -> Option<f64> {
        Some(signals::path_criticality(path))
    }

    fn snapshot_id(&self) -> String {
        let mut tips: Vec<String> = Vec::new();
        if let Ok(references) = self.repo.references() {
            for reference in references.flatten() {
                if let (Some(name), Some(target)) = (reference.name(), reference.target()) {
                    tips.push(format!("{name}={target}"));
                }
            }
        }
        tips.sort();

        let mut hasher = Sha256::new();
        if let Ok(Some(head)) = self.head_oid() {
            hasher.update(head.to_string().as_bytes());
        }
        for tip in &tips {
            hasher.update(tip.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Extract the source branch name from a merge commit summary.
///
/// Understands the messages written by `git merge`, by merging a
/// remote-tracking branch, and by GitHub pull requests.
///
/// # Examples
///
/// ```
/// use gitvitals_history::git::parse_merge_branch_name;
///
/// assert_eq!(
///     parse_merge_branch_name("Merge branch 'feature/login' into main").as_deref(),
///     Some("feature/login")
/// );
/// assert_eq!(
///     parse_merge_branch_name("Merge pull request #42 from acme/hotfix/crash").as_deref(),
///     Some("hotfix/crash")
/// );
/// assert_eq!(parse_merge_branch_name("fix: typo"), None);
/// ```
pub fn parse_merge_branch_name(summary: &str) -> Option<String> {
    let summary = summary.trim();
    let name = if let Some(rest) = summary.strip_prefix("Merge branch '") {
        rest.split('\'').next()?.to_string()
    } else if let Some(rest) = summary.strip_prefix("Merge remote-tracking branch '") {
        let tracking = rest.split('\'').next()?;
        tracking.split_once('/')?.1.to_string()
    } else if let Some(rest) = summary.strip_prefix("Merge pull request #") {
        let (_, source) = rest.split_once(" from ")?;
        let source = source.split_whitespace().next()?;
        source.split_once('/')?.1.to_string()
    } else {
        return None;
    };
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn git_err(context: &str) -> impl FnOnce(git2::Error) -> VitalsError + '_ {
    move |e| VitalsError::Git(format!("{context}: {e}"))
}

fn to_utc(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}

fn describe(commit: &git2::Commit, files_changed: Vec<FileChange>) -> Commit {
    let author = commit.author();
    let hash = commit.id().to_string();
    Commit {
        hash: hash[..hash.len().min(8)].to_string(),
        author: author.name().unwrap_or("unknown").to_string(),
        email: author.email().unwrap_or("unknown").to_string(),
        timestamp: to_utc(commit.time().seconds()),
        message: commit
            .message()
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("")
            .to_string(),
        files_changed,
    }
}

fn diff_against_first_parent<'r>(
    repo: &'r Repository,
    commit: &git2::Commit,
) -> Result<Diff<'r>, VitalsError> {
    let commit_tree = commit
        .tree()
        .map_err(git_err("failed to get commit tree"))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit.parent(0).map_err(git_err("failed to get parent"))?;
        Some(parent.tree().map_err(git_err("failed to get parent tree"))?)
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    repo.diff_tree_to_tree(
        parent_tree.as_ref(),
        Some(&commit_tree),
        Some(&mut diff_opts),
    )
    .map_err(git_err("failed to compute diff"))
}

fn delta_path(file: git2::DiffFile<'_>) -> String {
    file.path()
        .unwrap_or(Path::new(""))
        .to_string_lossy()
        .to_string()
}

fn extract_file_changes(mut diff: Diff<'_>) -> Result<Vec<FileChange>, VitalsError> {
    let mut find_opts = git2::DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))
        .map_err(git_err("failed to find renames"))?;

    let mut changes = Vec::new();
    for delta in diff.deltas() {
        let (path, status) = match delta.status() {
            Delta::Added => (delta_path(delta.new_file()), ChangeStatus::Added),
            // deleted files are recorded under their old path
            Delta::Deleted => (delta_path(delta.old_file()), ChangeStatus::Deleted),
            Delta::Renamed => (
                delta_path(delta.new_file()),
                ChangeStatus::Renamed {
                    from: delta_path(delta.old_file()),
                },
            ),
            _ => (delta_path(delta.new_file()), ChangeStatus::Modified),
        };
        if path.is_empty() {
            continue;
        }
        changes.push(FileChange {
            path,
            lines_added: 0,
            lines_deleted: 0,
            status,
        });
    }

    let mut line_counts: HashMap<String, (u64, u64)> = HashMap::new();
    diff.foreach(
        &mut |_delta, _progress| true,
        None,
        None,
        Some(&mut |delta, _hunk, line| {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .unwrap_or(Path::new(""))
                .to_string_lossy()
                .to_string();

            let entry = line_counts.entry(path).or_insert((0, 0));
            match line.origin() {
                '+' => entry.0 += 1,
                '-' => entry.1 += 1,
                _ => {}
            }
            true
        }),
    )
    .map_err(git_err("failed to iterate diff lines"))?;

    for change in &mut changes {
        if let Some((added, deleted)) = line_counts.get(&change.path) {
            change.lines_added = *added;
            change.lines_deleted = *deleted;
        }
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_merge_messages() {
        assert_eq!(
            parse_merge_branch_name("Merge branch 'bugfix/npe'").as_deref(),
            Some("bugfix/npe")
        );
        assert_eq!(
            parse_merge_branch_name("Merge branch 'feature/x' of github.com:acme/app").as_deref(),
            Some("feature/x")
        );
    }

    #[test]
    fn strips_remote_from_tracking_merges() {
        assert_eq!(
            parse_merge_branch_name("Merge remote-tracking branch 'origin/feature/sync'")
                .as_deref(),
            Some("feature/sync")
        );
    }

    #[test]
    fn strips_owner_from_pull_request_merges() {
        assert_eq!(
            parse_merge_branch_name("Merge pull request #7 from alice/feature/a-b").as_deref(),
            Some("feature/a-b")
        );
    }

    #[test]
    fn rejects_unrelated_or_empty_names() {
        assert_eq!(parse_merge_branch_name("Merge branch ''"), None);
        assert_eq!(parse_merge_branch_name("Revert \"Merge branch 'x'\""), None);
        assert_eq!(parse_merge_branch_name("Merge pull request #9"), None);
    }

    #[test]
    fn to_utc_handles_epoch() {
        assert_eq!(to_utc(0).timestamp(), 0);
        assert_eq!(to_utc(1_700_000_000).timestamp(), 1_700_000_000);
    }
}
