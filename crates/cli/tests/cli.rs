use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Command running offline against stub sources and a stub generator
fn offline_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("crypto-scout");
    cmd.current_dir(dir)
        .env("CRYPTO_SCOUT__SOURCES__PROVIDER", "stub")
        .env("CRYPTO_SCOUT__LLM__PROVIDER", "stub")
        .env_remove("RUST_LOG");
    cmd
}

fn summary(stdout: &[u8]) -> Value {
    let text = String::from_utf8_lossy(stdout);
    let lines: Vec<_> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines.len(), 1, "expected one summary line, got {text:?}");
    serde_json::from_str(lines[0]).expect("summary is json")
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read file")).expect("valid json")
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    let mut cmd = cargo_bin_cmd!("crypto-scout");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("project_cooldown_days = 7"));
    assert!(content.contains("dry_run = true"));

    // A second init without --force refuses to overwrite
    let mut cmd = cargo_bin_cmd!("crypto-scout");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn dry_run_prints_summary_and_leaves_state_empty() {
    let dir = TempDir::new().expect("temp dir");
    let state_path = dir.path().join("state.json");

    let output = offline_cmd(dir.path())
        .args(["run", "--dry-run", "--section", "new", "--state"])
        .arg(&state_path)
        .output()
        .expect("run");

    assert!(output.status.success());

    let report = summary(&output.stdout);
    assert_eq!(report["posted"], false);
    assert_eq!(report["attempted"], false);
    assert_eq!(report["reason"], "dry_run");
    assert_eq!(report["section"], "new");

    let state = read_json(&state_path);
    assert_eq!(state["seen_projects"].as_object().map(|m| m.len()), Some(0));
    assert_eq!(state["seen_texts"].as_object().map(|m| m.len()), Some(0));
}

#[test]
fn require_approval_writes_outbox_and_records_state() {
    let dir = TempDir::new().expect("temp dir");
    let state_path = dir.path().join("state.json");
    let outbox_path = dir.path().join("outbox.jsonl");

    for round in 1..=2 {
        let output = offline_cmd(dir.path())
            .args(["run", "--require-approval", "--section", "trending", "--outbox"])
            .arg(&outbox_path)
            .arg("--state")
            .arg(&state_path)
            .output()
            .expect("run");

        assert!(output.status.success());
        let report = summary(&output.stdout);
        assert_eq!(report["posted"], true, "round {round}: {report}");
        assert_eq!(report["provenance"], "fresh");

        let state = read_json(&state_path);
        assert_eq!(
            state["seen_projects"].as_object().map(|m| m.len()),
            Some(round)
        );
        assert_eq!(state["seen_texts"].as_object().map(|m| m.len()), Some(round));
    }

    let outbox = fs::read_to_string(&outbox_path).expect("read outbox");
    let entries: Vec<Value> = outbox
        .lines()
        .map(|l| serde_json::from_str(l).expect("outbox line is json"))
        .collect();
    assert_eq!(entries.len(), 2);
    assert_ne!(entries[0]["text"], entries[1]["text"]);

    for entry in &entries {
        let text = entry["text"].as_str().expect("text");
        let lines: Vec<_> = text.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("Risk:"));
        assert!(text.chars().count() <= 240);
    }
}

#[test]
fn summary_is_printed_when_state_cannot_be_saved() {
    let dir = TempDir::new().expect("temp dir");
    // A directory where the state file should go makes the final rename fail
    let state_path = dir.path().join("state.json");
    fs::create_dir_all(state_path.join("blocker")).expect("create dir");

    let output = offline_cmd(dir.path())
        .args(["run", "--require-approval", "--section", "new", "--outbox"])
        .arg(dir.path().join("outbox.jsonl"))
        .arg("--state")
        .arg(&state_path)
        .output()
        .expect("run");

    assert!(!output.status.success());
    let report = summary(&output.stdout);
    assert_eq!(report["posted"], true);
    assert!(report["post_id"].as_str().is_some());
    assert!(String::from_utf8_lossy(&output.stderr).contains("State error"));
}

#[test]
fn draft_outputs_formatted_json() {
    let dir = TempDir::new().expect("temp dir");

    let output = offline_cmd(dir.path())
        .args([
            "draft",
            "--name",
            "Foo Protocol",
            "--symbol",
            "FOO",
            "--url",
            "https://x/foo",
            "--json",
        ])
        .output()
        .expect("run draft");

    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let text = value["text"].as_str().expect("text");
    let lines: Vec<_> = text.split('\n').collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].ends_with("https://x/foo"));
    assert_eq!(value["duplicate"], false);
    assert_eq!(value["generated"], true);
    assert_eq!(value["fingerprint"].as_str().map(str::len), Some(64));
}

#[test]
fn state_show_without_file() {
    let dir = TempDir::new().expect("temp dir");

    offline_cmd(dir.path())
        .args(["state", "show", "--state"])
        .arg(dir.path().join("missing.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("No state file"));
}

#[test]
fn state_show_reports_corrupt_file() {
    let dir = TempDir::new().expect("temp dir");
    let state_path = dir.path().join("state.json");
    fs::write(&state_path, "{ not json").expect("write state");

    offline_cmd(dir.path())
        .args(["state", "show", "--state"])
        .arg(&state_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unreadable"));
}

#[test]
fn run_with_missing_config_file_fails() {
    let dir = TempDir::new().expect("temp dir");

    offline_cmd(dir.path())
        .args(["--config", "nope.toml", "run", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}
