//! Integration tests for the cadence CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const EXAMPLE_BACKLOG: &str = r#"{
  "items": [
    {"id": "A", "title": "Account model", "size": 3},
    {"id": "B", "title": "Account API", "size": 4},
    {"id": "C", "title": "Landing page", "size": 2}
  ],
  "edges": [{"from": "A", "to": "B"}],
  "iterations": [{"index": 0, "capacity": 5}, {"index": 1, "capacity": 5}]
}"#;

const CYCLIC_BACKLOG: &str = r#"{
  "items": [
    {"id": "A", "title": "First", "size": 1},
    {"id": "B", "title": "Second", "size": 1}
  ],
  "edges": [{"from": "A", "to": "B"}, {"from": "B", "to": "A"}],
  "iterations": [{"index": 0, "capacity": 5}]
}"#;

const OVERSIZED_BACKLOG: &str = r#"{
  "items": [
    {
      "id": "BIG",
      "title": "Reporting",
      "size": 13,
      "acceptance_criteria": ["csv", "pdf", "digest"]
    },
    {"id": "SMALL", "title": "Typo fix", "size": 1}
  ],
  "iterations": [{"index": 0, "capacity": 8}, {"index": 1, "capacity": 8}]
}"#;

/// Helper to create a workspace with a backlog file and a config that
/// disables edge inference.
fn setup_workspace(backlog: &str) -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let backlog_path = temp_dir.path().join("backlog.json");
    fs::write(&backlog_path, backlog).unwrap();

    let config_path = temp_dir.path().join("cadence.toml");
    fs::write(&config_path, "[inference]\nkeywords = false\nshared_components = false\n").unwrap();

    (temp_dir, backlog_path, config_path)
}

fn cadence(config: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("cadence").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("CADENCE_MAX_ITEM_SIZE")
        .env_remove("CADENCE_CYCLE_POLICY")
        .arg("--config")
        .arg(config);
    cmd
}

#[test]
fn test_plan_ready_backlog() {
    let (_dir, backlog, config) = setup_workspace(EXAMPLE_BACKLOG);

    cadence(&config)
        .arg("plan")
        .arg(&backlog)
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan is ready"))
        .stdout(predicate::str::contains("A, C"))
        .stdout(predicate::str::contains("Critical path: A -> B (7 points)"));
}

#[test]
fn test_plan_json_output() {
    let (_dir, backlog, config) = setup_workspace(EXAMPLE_BACKLOG);

    let output = cadence(&config).arg("plan").arg(&backlog).arg("--json").output().unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["plan"]["iterations"][0]["allocated_items"], serde_json::json!(["A", "C"]));
    assert_eq!(result["plan"]["iterations"][1]["allocated_items"], serde_json::json!(["B"]));
    assert_eq!(result["critical_path_size"], 7);
    assert_eq!(result["validation"]["issues"], serde_json::json!([]));
}

#[test]
fn test_plan_with_cycle_exits_not_ready() {
    let (_dir, backlog, config) = setup_workspace(CYCLIC_BACKLOG);

    cadence(&config)
        .arg("plan")
        .arg(&backlog)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("circular_dependency"))
        .stdout(predicate::str::contains("Plan is not ready"));
}

#[test]
fn test_missing_backlog_file_fails() {
    let (dir, _backlog, config) = setup_workspace(EXAMPLE_BACKLOG);

    cadence(&config)
        .arg("plan")
        .arg(dir.path().join("missing.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read backlog file"));
}

#[test]
fn test_malformed_backlog_fails() {
    let (_dir, backlog, config) = setup_workspace("{\"items\": 42}");

    cadence(&config)
        .arg("plan")
        .arg(&backlog)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse backlog file"));
}

#[test]
fn test_invalid_config_fails() {
    let (dir, backlog, _config) = setup_workspace(EXAMPLE_BACKLOG);
    let bad_config = dir.path().join("bad.toml");
    fs::write(&bad_config, "max_item_size = 0\n").unwrap();

    cadence(&bad_config).arg("plan").arg(&backlog).assert().code(1);
}

#[test]
fn test_decompose_lists_parts() {
    let (_dir, backlog, config) = setup_workspace(OVERSIZED_BACKLOG);

    cadence(&config)
        .arg("decompose")
        .arg(&backlog)
        .assert()
        .success()
        .stdout(predicate::str::contains("BIG.1"))
        .stdout(predicate::str::contains("BIG.3"))
        .stdout(predicate::str::contains("Unchanged items: 1"));
}

#[test]
fn test_decompose_json_output() {
    let (_dir, backlog, config) = setup_workspace(OVERSIZED_BACKLOG);

    let output = cadence(&config).arg("decompose").arg(&backlog).arg("--json").output().unwrap();
    assert!(output.status.success());

    let outcomes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcomes[0]["status"], "split");
    assert_eq!(outcomes[0]["result"]["items"].as_array().unwrap().len(), 3);
    assert_eq!(outcomes[1]["status"], "unchanged");
}

#[test]
fn test_critical_path_command() {
    let (_dir, backlog, config) = setup_workspace(EXAMPLE_BACKLOG);

    cadence(&config)
        .arg("critical-path")
        .arg(&backlog)
        .assert()
        .success()
        .stdout(predicate::str::contains("1. A"))
        .stdout(predicate::str::contains("2. B"))
        .stdout(predicate::str::contains("Total size: 7 points"));
}

#[test]
fn test_critical_path_with_cycle_exits_not_ready() {
    let (_dir, backlog, config) = setup_workspace(CYCLIC_BACKLOG);

    cadence(&config).arg("critical-path").arg(&backlog).assert().code(2);
}
