//! E2E tests for the `wrk` binary against a throwaway workspace.
//!
//! Each test lays out `work-queue/` and `.claude/state/` under a temp
//! directory and runs the binary there.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

fn wrk_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("wrk"));
    cmd.current_dir(dir);
    cmd.env("WRK_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

fn workspace() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join("work-queue")).expect("queue root");
    fs::create_dir_all(dir.path().join(".claude/state")).expect("state dir");
    dir
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, text).expect("write");
}

fn json_stdout(cmd: &mut Command) -> (Value, i32) {
    let output = cmd.output().expect("wrk should not crash");
    let code = output.status.code().expect("exit code");
    let json = serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    });
    (json, code)
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_rejects_negative_last_id() {
    let dir = workspace();
    write(dir.path(), ".claude/state/state.yaml", "last_id: -1\n");

    let (json, code) = json_stdout(wrk_cmd(dir.path()).args([
        "validate",
        ".claude/state/state.yaml",
        "--json",
    ]));
    assert_eq!(code, 1);
    assert_eq!(json["valid"], false);
    let errors = json["errors"].as_array().expect("errors array");
    assert!(errors.iter().any(|e| e["path"] == "last_id"), "{json}");
}

#[test]
fn validate_accepts_well_formed_state() {
    let dir = workspace();
    write(dir.path(), ".claude/state/state.yaml", "last_id: 41\n");

    wrk_cmd(dir.path())
        .args(["validate", ".claude/state/state.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn validate_missing_file_is_not_found() {
    let dir = workspace();
    wrk_cmd(dir.path())
        .args(["validate", ".claude/state/state.yaml"])
        .assert()
        .code(2);
}

// ---------------------------------------------------------------------------
// gates
// ---------------------------------------------------------------------------

#[test]
fn gates_report_lists_every_gate() {
    let dir = workspace();
    write(
        dir.path(),
        "work-queue/working/WRK-3.md",
        "---\nid: WRK-3\nstatus: working\nplan_reviewed: true\nplan_approved: true\n---\n",
    );
    write(dir.path(), "work-queue/assets/WRK-3/plan.md", "# Plan\n");

    let (json, code) = json_stdout(wrk_cmd(dir.path()).args(["gates", "WRK-3", "--json"]));
    assert_eq!(code, 1);
    assert_eq!(json["id"], "WRK-3");
    assert_eq!(json["ok"], false);
    let gates = json["gates"].as_array().expect("gates array");
    assert_eq!(gates.len(), 5);
    let plan = gates.iter().find(|g| g["gate"] == "plan").expect("plan gate");
    assert_eq!(plan["ok"], true);
    assert!(gates.iter().all(|g| g["details"].is_string()));
}

#[test]
fn gates_for_unknown_item_is_not_found() {
    let dir = workspace();
    wrk_cmd(dir.path())
        .args(["gates", "WRK-404"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("WRK-404"));
}

#[test]
fn malformed_id_is_rejected() {
    let dir = workspace();
    wrk_cmd(dir.path()).args(["show", "ticket-9"]).assert().code(1);
}

// ---------------------------------------------------------------------------
// reconcile / migrate
// ---------------------------------------------------------------------------

#[test]
fn reconcile_repairs_moved_item() {
    let dir = workspace();
    write(
        dir.path(),
        "work-queue/done/WRK-12.md",
        "---\nid: WRK-12\nstatus: working\n---\n# WRK-12\n",
    );

    let (json, code) = json_stdout(wrk_cmd(dir.path()).args(["reconcile", "--json"]));
    assert_eq!(code, 0);
    let outcomes = json.as_array().expect("outcome list");
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0]["action"], "repaired");
    assert_eq!(outcomes[0]["written"], true);

    let text = fs::read_to_string(dir.path().join("work-queue/done/WRK-12.md")).expect("read");
    assert!(text.contains("status: done"));
    assert!(!text.contains("status: working"));
}

#[test]
fn reconcile_dry_run_leaves_file_alone() {
    let dir = workspace();
    let original = "---\nid: WRK-5\nstatus: pending\n---\n";
    write(dir.path(), "work-queue/working/WRK-5.md", original);

    wrk_cmd(dir.path())
        .args(["reconcile", "WRK-5", "--dry-run"])
        .assert()
        .success();
    let text = fs::read_to_string(dir.path().join("work-queue/working/WRK-5.md")).expect("read");
    assert_eq!(text, original);
}

#[test]
fn migrate_canonicalizes_synonyms() {
    let dir = workspace();
    write(dir.path(), "work-queue/done/WRK-2.md", "---\nid: WRK-2\nstatus: complete\n---\n");

    wrk_cmd(dir.path()).args(["migrate"]).assert().success();
    let text = fs::read_to_string(dir.path().join("work-queue/done/WRK-2.md")).expect("read");
    assert!(text.contains("status: done"));
}

// ---------------------------------------------------------------------------
// session / show / create
// ---------------------------------------------------------------------------

#[test]
fn session_snapshot_is_visible_in_show() {
    let dir = workspace();
    write(
        dir.path(),
        "work-queue/working/WRK-7.md",
        "---\nid: WRK-7\ntitle: Wire the scanner\nstatus: working\n---\n# WRK-7\n\n## What\n\nWire it up.\n",
    );

    wrk_cmd(dir.path())
        .args([
            "session", "WRK-7", "--notes", "halfway", "--file", "src/scan.rs", "--next", "tests",
        ])
        .assert()
        .success();

    let (json, code) = json_stdout(wrk_cmd(dir.path()).args(["show", "WRK-7", "--json"]));
    assert_eq!(code, 0);
    assert_eq!(json["title"], "Wire the scanner");
    assert_eq!(json["consistent"], true);
    assert_eq!(json["what"], "Wire it up.");
    assert_eq!(json["session_state"]["progress_notes"], "halfway");
    assert_eq!(json["session_state"]["modified_files"][0], "src/scan.rs");
    assert_eq!(json["session_state"]["next_steps"][0], "tests");
}

#[test]
fn create_allocates_after_ledger_and_files() {
    let dir = workspace();
    write(dir.path(), ".claude/state/state.yaml", "last_id: 20\n");
    write(dir.path(), "work-queue/done/WRK-9.md", "---\nid: WRK-9\nstatus: done\n---\n");

    let (json, code) = json_stdout(wrk_cmd(dir.path()).args([
        "create",
        "--title",
        "Audit gates",
        "--priority",
        "high",
        "--json",
    ]));
    assert_eq!(code, 0);
    assert_eq!(json["id"], "WRK-21");
    assert_eq!(json["location"], "pending");

    let (shown, _) = json_stdout(wrk_cmd(dir.path()).args(["show", "WRK-21", "--json"]));
    assert_eq!(shown["status"], "pending");
    assert_eq!(shown["title"], "Audit gates");
}

#[test]
fn show_unknown_item_is_not_found() {
    let dir = workspace();
    wrk_cmd(dir.path()).args(["show", "WRK-1"]).assert().code(2);
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

#[test]
fn scan_reports_missing_fields_and_fails() {
    let dir = workspace();
    write(
        dir.path(),
        "work-queue/pending/WRK-1.md",
        "---\nid: WRK-1\nstatus: pending\npriority: high\n---\n",
    );

    let (json, code) = json_stdout(wrk_cmd(dir.path()).args(["scan", "--json"]));
    assert_eq!(code, 1);
    let missing = json["missing_fields"].as_array().expect("missing list");
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0]["id"], "WRK-1");
    let fields: Vec<&str> = missing[0]["missing"]
        .as_array()
        .expect("fields")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(fields, ["complexity", "route", "provider"]);
}

#[test]
fn scan_of_complete_queue_succeeds() {
    let dir = workspace();
    write(
        dir.path(),
        "work-queue/pending/WRK-1.md",
        "---\nid: WRK-1\nstatus: pending\npriority: high\ncomplexity: simple\nroute: a\nprovider: codex\n---\n",
    );
    wrk_cmd(dir.path()).args(["scan"]).assert().success();
}

#[test]
fn missing_queue_root_is_not_found() {
    let dir = TempDir::new().expect("tempdir");
    wrk_cmd(dir.path()).args(["scan"]).assert().code(2);
}

#[test]
fn config_file_moves_the_queue() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), ".wrk/config.toml", "[queue]\nroot = \"q\"\n");
    write(dir.path(), "q/blocked/WRK-3.md", "---\nid: WRK-3\nstatus: blocked\n---\n");

    let (json, code) = json_stdout(wrk_cmd(dir.path()).args(["show", "WRK-3", "--json"]));
    assert_eq!(code, 0);
    assert_eq!(json["location"], "blocked");
}
