//! End-to-end tests for the `bk` binary.
//!
//! Each test runs `bk` as a subprocess against a database in its own temp
//! directory.

use assert_cmd::Command;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn bk_cmd(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bk").expect("bk binary should build");
    cmd.arg("--db").arg(db);
    cmd.env("BK_ACTOR", "test-actor");
    cmd.env_remove("BK_TEST_DB");
    cmd.env_remove("BOARDKEEP_DB");
    cmd.env("RUST_LOG", "error");
    cmd
}

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("boardkeep.db")
}

/// Run a command expected to succeed and parse its JSON output.
fn run_json(db: &Path, args: &[&str]) -> Value {
    let output = bk_cmd(db)
        .args(args)
        .arg("--json")
        .output()
        .expect("bk should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("output should be valid JSON")
}

fn init(db: &Path) -> Value {
    run_json(db, &["init"])
}

fn first_workspace_id(db: &Path) -> String {
    let list = run_json(db, &["workspace", "list"]);
    list["workspaces"][0]["id"].as_str().expect("workspace id").to_string()
}

#[test]
fn init_seeds_starter_workspace() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);

    let out = init(&db);
    assert_eq!(out["seeded"], true);

    let list = run_json(&db, &["workspace", "list"]);
    assert_eq!(list["count"], 1);
}

#[test]
fn init_twice_requires_force() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    init(&db);

    bk_cmd(&db).args(["init", "--json"]).assert().failure().code(2);

    let out = run_json(&db, &["init", "--force"]);
    assert_eq!(out["seeded"], true);
}

#[test]
fn commands_before_init_report_not_initialized() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);

    let output = bk_cmd(&db)
        .args(["workspace", "list", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let err: Value = serde_json::from_slice(&output.stderr).expect("structured error");
    assert_eq!(err["error"]["code"], "NOT_INITIALIZED");
}

#[test]
fn moving_a_task_to_done_completes_it() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    init(&db);
    let ws = first_workspace_id(&db);

    let board = run_json(&db, &["board", "create", &ws, "Release"]);
    let columns: Vec<String> = board["column_ids"]
        .as_array()
        .expect("column ids")
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect();
    assert_eq!(columns.len(), 3);

    let task = run_json(&db, &["task", "create", &columns[0], "Ship it", "-p", "urgent"]);
    let task_id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["priority"], "high");
    assert_eq!(task["completed"], false);

    let moved = run_json(&db, &["task", "move", &task_id, "--to", &columns[2]]);
    assert_eq!(moved["moved"], true);
    assert_eq!(moved["task"]["completed"], true);
    assert_eq!(moved["task"]["percent_complete"], 100);
    assert_eq!(moved["task"]["column_status"], "done");

    let shown = run_json(&db, &["task", "show", &task_id]);
    assert_eq!(shown["task"]["column_id"], columns[2].as_str());
    assert_eq!(shown["task"]["movement_history"].as_array().unwrap().len(), 1);
}

#[test]
fn moving_within_the_same_slot_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    init(&db);
    let ws = first_workspace_id(&db);
    let board = run_json(&db, &["board", "create", &ws, "Ops"]);
    let todo = board["column_ids"][0].as_str().unwrap().to_string();

    let task = run_json(&db, &["task", "create", &todo, "Stay put"]);
    let task_id = task["id"].as_str().unwrap();

    let out = run_json(&db, &["task", "move", task_id, "--to", &todo]);
    assert_eq!(out["moved"], false);
}

#[test]
fn deleting_unknown_ids_fails_with_not_found() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    init(&db);

    for entity in ["workspace", "board", "column", "task", "item"] {
        let output = bk_cmd(&db)
            .args([entity, "delete", "missing-id", "--json"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(3), "{entity} delete");
    }
}

#[test]
fn deleting_a_workspace_cascades() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    init(&db);
    let ws = first_workspace_id(&db);

    let out = run_json(&db, &["workspace", "delete", &ws]);
    assert_eq!(out["deleted"], true);

    let list = run_json(&db, &["workspace", "list"]);
    assert_eq!(list["count"], 0);

    let doctor = run_json(&db, &["doctor"]);
    assert_eq!(doctor["ok"], true);
    assert_eq!(doctor["counts"]["tasks"], 0);
}

#[test]
fn export_then_import_restores_contents() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    let snapshot = dir.path().join("snapshot.json");
    init(&db);
    let snapshot_arg = snapshot.to_str().unwrap();

    let exported = run_json(&db, &["export", snapshot_arg]);
    assert_eq!(exported["counts"]["workspaces"], 1);
    assert!(snapshot.exists());

    let ws = first_workspace_id(&db);
    run_json(&db, &["board", "create", &ws, "Scratch"]);

    let report = run_json(&db, &["import", snapshot_arg]);
    assert_eq!(report["imported"]["workspaces"], 1);
    assert_eq!(report["imported"]["boards"], 1);
    assert_eq!(report["replaced"]["boards"], 2);

    let boards = run_json(&db, &["board", "list", &ws]);
    assert_eq!(boards["count"], 1);
}

#[test]
fn importing_a_malformed_snapshot_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"version": 1, "workspaces": []}"#).unwrap();
    init(&db);

    let output = bk_cmd(&db)
        .args(["import", bad.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));

    let list = run_json(&db, &["workspace", "list"]);
    assert_eq!(list["count"], 1);
}

#[test]
fn stale_reports_nothing_on_a_fresh_board() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    init(&db);

    let out = run_json(&db, &["stale", "--days", "7"]);
    assert_eq!(out["count"], 0);
}

#[test]
fn version_reports_formats() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);

    let out = run_json(&db, &["version"]);
    assert_eq!(out["snapshot_format"], 1);
    assert!(out["version"].is_string());
}
