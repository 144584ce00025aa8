use std::path::Path;
use std::process::Command;

use covgate_check::{load_change, DiffSource};
use covgate_core::{Baseline, CovgateConfig};
use git2::{Repository, Signature};

fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) {
    let root = repo.workdir().unwrap();
    if let Some(parent) = Path::new(name).parent() {
        std::fs::create_dir_all(root.join(parent)).unwrap();
    }
    std::fs::write(root.join(name), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::now("covgate", "covgate@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

fn config(candidates: &[&str]) -> CovgateConfig {
    let mut config = CovgateConfig::default();
    config.baseline.candidates = candidates.iter().map(|c| c.to_string()).collect();
    config
}

#[test]
fn change_since_previous_commit_maps_new_lines() {
    if Command::new("git").arg("--version").output().is_err() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_file(&repo, "internal/agent/agent.go", "package agent\n", "first");
    commit_file(
        &repo,
        "internal/agent/agent.go",
        "package agent\n\nfunc Run() {}\n",
        "second",
    );

    let sub = dir.path().join("internal");
    let change = load_change(
        &DiffSource::Git { base: None },
        &sub,
        &config(&["does-not-exist", "HEAD~1"]),
    )
    .unwrap();

    assert_eq!(change.baseline, Some(Baseline::Revision("HEAD~1".into())));
    assert_eq!(change.lines.file_count(), 1);
    assert!(!change.lines.contains("internal/agent/agent.go", 1));
    assert!(change.lines.contains("internal/agent/agent.go", 2));
    assert!(change.lines.contains("internal/agent/agent.go", 3));
}

#[test]
fn single_commit_checks_uncommitted_edits() {
    if Command::new("git").arg("--version").output().is_err() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_file(&repo, "main.go", "package main\n", "only");
    std::fs::write(dir.path().join("main.go"), "package main\n\nvar x = 1\n").unwrap();

    let change = load_change(
        &DiffSource::Git { base: None },
        dir.path(),
        &config(&["HEAD~1"]),
    )
    .unwrap();

    assert_eq!(change.baseline, Some(Baseline::WorkingTree));
    assert!(change.lines.contains("main.go", 3));
}
