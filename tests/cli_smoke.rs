use assert_cmd::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn init_git_repo(dir: &Path) {
    // init and basic identity
    assert!(Command::new("git")
        .args(["init"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["config", "core.autocrlf", "false"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["config", "user.email", "you@example.com"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["config", "user.name", "Your Name"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn commit_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut f = File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.sync_all().unwrap();
    assert!(Command::new("git")
        .args(["add", "."])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["commit", "-m", &format!("add {name}")])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut cmd = Command::cargo_bin("gitpulse").unwrap();
    cmd.current_dir(dir).arg("--repo").arg(dir).args(args);
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

#[test]
fn timeline_json_outputs_baseline_and_buckets() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "src/a.rs", "fn a(){}\n");
    commit_file(dir.path(), "src/b.rs", "fn b(){}\n");

    let v = run_json(dir.path(), &["timeline", "--json"]);
    let points = v.get("points").and_then(|p| p.as_array()).unwrap();
    assert!(points.len() >= 2);

    // First point is the synthetic zero baseline.
    let baseline = &points[0];
    assert_eq!(baseline["commit_count"].as_u64().unwrap(), 0);
    assert_eq!(baseline["cumulative_lines"]["total"].as_i64().unwrap(), 0);

    // Every breakdown conserves its category sum, and cumulatives stay
    // non-negative.
    for point in points {
        for key in [
            "lines_added",
            "lines_deleted",
            "cumulative_lines",
            "bytes_added",
            "bytes_deleted",
            "cumulative_bytes",
        ] {
            let b = &point[key];
            let total = b["total"].as_i64().unwrap();
            let sum = b["application"].as_i64().unwrap()
                + b["test"].as_i64().unwrap()
                + b["build"].as_i64().unwrap()
                + b["documentation"].as_i64().unwrap()
                + b["other"].as_i64().unwrap();
            assert_eq!(total, sum);
        }
        assert!(point["cumulative_lines"]["total"].as_i64().unwrap() >= 0);
    }
}

#[test]
fn sequence_json_starts_at_synthetic_baseline() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "lib.rs", "pub fn hi(){}\n");
    commit_file(dir.path(), "lib.rs", "pub fn hi(){ println!(\"hi\"); }\n");

    let v = run_json(dir.path(), &["sequence", "--json"]);
    let points = v.get("points").and_then(|p| p.as_array()).unwrap();
    assert_eq!(points.len(), 3);
    assert_eq!(points[0]["sha"].as_str().unwrap(), "start");
    assert_eq!(points[0]["cumulative_lines"].as_i64().unwrap(), 0);
    assert_eq!(points[1]["index"].as_u64().unwrap(), 1);
    assert!(points[2]["cumulative_lines"].as_i64().unwrap() >= 1);
}

#[test]
fn export_json_round_trips_commit_records() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "src/app.ts", "const a = 1;\nconst b = 2;\n");

    let v = run_json(dir.path(), &["export", "--json"]);
    let entries = v.get("entries").and_then(|e| e.as_array()).unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry["lines_added"].as_u64().unwrap(), 2);
    assert_eq!(entry["bytes_added"].as_u64().unwrap(), 100);
    let files = entry["files"].as_array().unwrap();
    assert_eq!(files[0]["file_type"].as_str().unwrap(), "TypeScript");
}

#[test]
fn exclude_pattern_removes_paths_from_aggregates() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "src/app.ts", "const a = 1;\n");
    commit_file(dir.path(), "vendor/dep.ts", "const dep = 1;\nconst x = 2;\n");

    let all = run_json(dir.path(), &["export", "--json"]);
    let all_added: u64 = all["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["lines_added"].as_u64().unwrap())
        .sum();
    assert_eq!(all_added, 3);

    let filtered = run_json(
        dir.path(),
        &["--exclude", "vendor/**", "--clear-cache", "export", "--json"],
    );
    let filtered_added: u64 = filtered["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["lines_added"].as_u64().unwrap())
        .sum();
    assert_eq!(filtered_added, 1);
}

#[test]
fn max_commits_bounds_the_window() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "a.txt", "one\n");
    commit_file(dir.path(), "b.txt", "two\n");
    commit_file(dir.path(), "c.txt", "three\n");

    let v = run_json(dir.path(), &["--max-commits", "2", "export", "--json"]);
    let entries = v["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    // The bounded window keeps the newest commits.
    let messages: Vec<&str> = entries
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages, vec!["add b.txt", "add c.txt"]);
}

#[test]
fn cached_second_run_matches_first() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "a.txt", "one\n");
    commit_file(dir.path(), "b.txt", "two\n");

    let first = run_json(dir.path(), &["export", "--json"]);
    assert!(dir.path().join(".gitpulse").join("cache.db").exists());

    // Second run is served from the cache and must agree.
    let second = run_json(dir.path(), &["export", "--json"]);
    assert_eq!(first["entries"], second["entries"]);

    // A new commit extends, rather than invalidates, the entry.
    commit_file(dir.path(), "c.txt", "three\n");
    let third = run_json(dir.path(), &["export", "--json"]);
    assert_eq!(third["entries"].as_array().unwrap().len(), 3);
}

#[test]
fn rename_across_exclusion_boundary_subtracts_prior_size() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    let body = "line\n".repeat(40);
    commit_file(dir.path(), "src/big.ts", &body);

    // Rename into the excluded tree.
    fs::create_dir_all(dir.path().join("attic")).unwrap();
    assert!(Command::new("git")
        .args(["mv", "src/big.ts", "attic/big.ts"])
        .current_dir(dir.path())
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["commit", "-m", "hide big.ts"])
        .current_dir(dir.path())
        .status()
        .unwrap()
        .success());

    let v = run_json(
        dir.path(),
        &["--exclude", "attic/**", "sequence", "--json"],
    );
    let points = v["points"].as_array().unwrap();
    // +40 lines, then the full 40-line file leaves the measured tree.
    assert_eq!(points[1]["cumulative_lines"].as_i64().unwrap(), 40);
    assert_eq!(points[2]["cumulative_lines"].as_i64().unwrap(), 0);
    assert_eq!(points[2]["net_lines"].as_i64().unwrap(), -40);
}
