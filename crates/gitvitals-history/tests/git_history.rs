use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use git2::{Oid, Repository, Signature, Time};
use gitvitals_core::HistoryConfig;
use gitvitals_history::{BranchFilter, GitHistory, HistoryFeed};

const BASE: i64 = 1_700_000_000;
const DAY: i64 = 86_400;

fn at(day: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(BASE + day * DAY, 0).unwrap()
}

fn signature(name: &str, day: i64) -> Signature<'static> {
    Signature::new(name, &format!("{name}@example.com"), &Time::new(BASE + day * DAY, 0)).unwrap()
}

fn write_file(repo: &Repository, path: &str, content: &str) {
    let full = repo.workdir().unwrap().join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(full, content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
}

fn make_commit(
    repo: &Repository,
    update_ref: &str,
    author: &str,
    day: i64,
    message: &str,
    parents: &[Oid],
) -> Oid {
    let mut index = repo.index().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let parents: Vec<git2::Commit> = parents
        .iter()
        .map(|oid| repo.find_commit(*oid).unwrap())
        .collect();
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    let sig = signature(author, day);
    repo.commit(Some(update_ref), &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

/// main: c0 (day 0) ── merge of feature/login (day 4)
/// feature/login: f1 (day 1), f2 (day 3)
/// feature/wip: w1 (day 5), still open
/// release/1: r1 (day 6), not a work branch
fn build_repo(dir: &Path) -> Repository {
    let repo = Repository::init(dir).unwrap();

    write_file(&repo, "README.md", "# demo\n");
    write_file(&repo, "src/main.rs", "fn main() {\n\n    run();\n}\n");
    let c0 = make_commit(&repo, "refs/heads/main", "alice", 0, "initial commit", &[]);
    repo.set_head("refs/heads/main").unwrap();

    write_file(&repo, "src/login.rs", "pub fn login() {}\n");
    let f1 = make_commit(&repo, "refs/heads/feature/login", "bob", 1, "add login", &[c0]);
    write_file(&repo, "src/login.rs", "pub fn login() {}\npub fn logout() {}\n");
    let f2 = make_commit(&repo, "refs/heads/feature/login", "bob", 3, "add logout", &[f1]);

    let merge = make_commit(
        &repo,
        "refs/heads/main",
        "alice",
        4,
        "Merge branch 'feature/login'",
        &[c0, f2],
    );

    write_file(&repo, "src/wip.rs", "// wip\n");
    make_commit(&repo, "refs/heads/feature/wip", "carol", 5, "start wip", &[merge]);
    write_file(&repo, "CHANGELOG.md", "1.0\n");
    make_commit(&repo, "refs/heads/release/1", "alice", 6, "release", &[merge]);

    repo
}

#[test]
fn list_commits_walks_head_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());
    let history = GitHistory::open(dir.path(), &HistoryConfig::default()).unwrap();

    let commits = history.list_commits(at(-1), at(30)).unwrap();
    let messages: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Merge branch 'feature/login'",
            "add logout",
            "add login",
            "initial commit"
        ]
    );

    let logout = &commits[1];
    assert_eq!(logout.email, "bob@example.com");
    assert_eq!(logout.files_changed.len(), 1);
    assert_eq!(logout.files_changed[0].path, "src/login.rs");
    assert_eq!(logout.files_changed[0].lines_added, 1);
}

#[test]
fn list_commits_respects_window() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());
    let history = GitHistory::open(dir.path(), &HistoryConfig::default()).unwrap();

    let commits = history.list_commits(at(1), at(3)).unwrap();
    let messages: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(messages, vec!["add logout", "add login"]);
}

#[test]
fn large_commits_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());
    let config = HistoryConfig {
        max_files_per_commit: 1,
        ..HistoryConfig::default()
    };
    let history = GitHistory::open(dir.path(), &config).unwrap();

    let commits = history.list_commits(at(-1), at(30)).unwrap();
    for commit in &commits {
        assert!(
            commit.files_changed.len() <= 1,
            "commit {} has {} files",
            commit.hash,
            commit.files_changed.len()
        );
    }
    assert!(commits.iter().all(|c| c.message != "initial commit"));
}

#[test]
fn list_branches_finds_merged_and_open_work() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());
    let history = GitHistory::open(dir.path(), &HistoryConfig::default()).unwrap();
    let filter = BranchFilter::new(&gitvitals_core::default_branch_patterns()).unwrap();

    let branches = history.list_branches(&filter).unwrap();
    let names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["feature/login", "feature/wip"]);

    let login = &branches[0];
    assert_eq!(login.merged_at, Some(at(4)));
    assert_eq!(login.commits.len(), 2);
    assert_eq!(login.commits[0].message, "add login");
    assert_eq!(login.first_commit_at(), Some(at(1)));
    assert!(login.created_at <= at(1));

    let wip = &branches[1];
    assert!(wip.merged_at.is_none());
    assert_eq!(wip.commits.len(), 1);
    assert!(wip.created_at <= at(5));
}

#[test]
fn list_branches_honours_patterns() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());
    let history = GitHistory::open(dir.path(), &HistoryConfig::default()).unwrap();

    let filter = BranchFilter::new(&["release/*"]).unwrap();
    let branches = history.list_branches(&filter).unwrap();
    assert_eq!(branches.len(), 1);
    assert_eq!(branches[0].name, "release/1");
    assert!(!branches[0].is_merged());
}

#[test]
fn working_tree_signals() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());
    let history = GitHistory::open(dir.path(), &HistoryConfig::default()).unwrap();

    assert_eq!(history.complexity("src/main.rs"), Some(3.0));
    assert_eq!(history.complexity("missing.rs"), None);
    assert_eq!(history.criticality("src/main.rs"), Some(1.5));
    assert_eq!(history.criticality("src/login.rs"), Some(1.0));
}

#[test]
fn empty_repository_yields_empty_history() {
    let dir = tempfile::tempdir().unwrap();
    Repository::init(dir.path()).unwrap();
    let history = GitHistory::open(dir.path(), &HistoryConfig::default()).unwrap();

    let now = Utc::now();
    assert!(history
        .list_commits(now - Duration::days(30), now)
        .unwrap()
        .is_empty());
    let filter = BranchFilter::new(&["*"]).unwrap();
    assert!(history.list_branches(&filter).unwrap().is_empty());
}

#[test]
fn snapshot_id_changes_with_new_commits() {
    let dir = tempfile::tempdir().unwrap();
    let repo = build_repo(dir.path());
    let history = GitHistory::open(dir.path(), &HistoryConfig::default()).unwrap();
    let before = history.snapshot_id();
    assert_eq!(before, history.snapshot_id());

    let head = repo.head().unwrap().target().unwrap();
    write_file(&repo, "src/extra.rs", "fn extra() {}\n");
    make_commit(&repo, "refs/heads/main", "alice", 7, "extra", &[head]);

    let reopened = GitHistory::open(dir.path(), &HistoryConfig::default()).unwrap();
    assert_ne!(before, reopened.snapshot_id());
}

#[test]
fn open_on_plain_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = GitHistory::open(dir.path(), &HistoryConfig::default());
    assert!(matches!(
        result,
        Err(gitvitals_core::VitalsError::Git(_))
    ));
}
