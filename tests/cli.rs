use std::path::Path;
use std::process::{Command, Output};

use git2::{Oid, Repository, Signature, Time};

const BASE: i64 = 1_700_000_000;
const DAY: i64 = 86_400;

fn commit_file(repo: &Repository, refname: &str, author: &str, day: i64, path: &str, parents: &[Oid]) -> Oid {
    let full = repo.workdir().unwrap().join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(&full, format!("// {author} on day {day}\n")).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();

    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let parents: Vec<git2::Commit> = parents.iter().map(|o| repo.find_commit(*o).unwrap()).collect();
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    let sig = Signature::new(author, &format!("{author}@example.com"), &Time::new(BASE + day * DAY, 0)).unwrap();
    repo.commit(Some(refname), &sig, &sig, &format!("edit {path}"), &tree, &parent_refs)
        .unwrap()
}

fn build_repo(dir: &Path) {
    let repo = Repository::init(dir).unwrap();
    let mut tip = commit_file(&repo, "refs/heads/main", "alice", 0, "src/lib.rs", &[]);
    repo.set_head("refs/heads/main").unwrap();
    for day in 1..20 {
        let author = if day % 8 == 0 { "bob" } else { "alice" };
        tip = commit_file(&repo, "refs/heads/main", author, day, "src/lib.rs", &[tip]);
    }
}

fn gitvitals(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gitvitals"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

const AS_OF: &str = "2023-12-05T00:00:00Z";

#[test]
fn analyze_emits_one_json_result_per_metric() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());

    let output = gitvitals(dir.path(), &["analyze", "--format", "json", "--as-of", AS_OF]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let results: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(results.len(), 8);
    assert_eq!(results[0]["metric"], "bus_factor");
    assert_eq!(results[0]["asOf"], "2023-12-05T00:00:00Z");
    assert_eq!(results[0]["report"]["busFactor"]["busFactor"], 1);
}

#[test]
fn analyze_runs_only_requested_metrics() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());

    let output = gitvitals(
        dir.path(),
        &[
            "analyze", "--format", "json", "--as-of", AS_OF,
            "--metric", "knowledge-distribution", "--metric", "bus_factor",
        ],
    );
    assert!(output.status.success());
    let results: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = results.iter().map(|r| r["metric"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["knowledge_distribution", "bus_factor"]);
}

#[test]
fn fail_on_sets_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());

    // one dominant author makes the bus factor critical
    let output = gitvitals(
        dir.path(),
        &["analyze", "--metric", "bus_factor", "--as-of", AS_OF, "--fail-on", "high"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Bus Factor [CRITICAL]"));
}

#[test]
fn unknown_metric_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());

    let output = gitvitals(dir.path(), &["analyze", "--metric", "happiness"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("happiness"));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());

    let output = gitvitals(dir.path(), &["analyze", "--config", "absent.toml"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.toml"));
}

#[test]
fn out_of_range_lookback_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());

    let output = gitvitals(dir.path(), &["analyze", "--lookback-months", "10000000"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("lookback_months"));
}

#[test]
fn analyze_outside_a_repository_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = gitvitals(dir.path(), &["analyze"]);
    assert!(!output.status.success());
}

#[test]
fn metrics_lists_every_analyzer() {
    let dir = tempfile::tempdir().unwrap();
    let output = gitvitals(dir.path(), &["metrics", "--format", "json"]);
    assert!(output.status.success());
    let list: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(list.len(), 8);
    assert!(list.iter().any(|m| m["name"] == "cycle_time"));
}
