//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `xray` binary against the exported
//! histories under `fixtures/histories/`, and verifies exit codes, stdout
//! content and stderr content.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/histories")
}

/// Helper: an `xray` command reading the fixture histories.
fn xray() -> Command {
    let mut cmd = cargo_bin_cmd!("xray");
    cmd.env_remove("TEMPORAL_NAMESPACE")
        .env_remove("RUST_LOG")
        .env("XRAY_HISTORY_DIR", fixtures_dir());
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    xray()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Summarize and diff workflow execution histories",
        ));
}

#[test]
fn version_exits_0() {
    xray()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("xray"));
}

// ──────────────────────────────────────────────
// 2. history
// ──────────────────────────────────────────────

#[test]
fn history_text_shows_timeline() {
    xray()
        .args(["history", "order-123"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "OrderWorkflow order-123 (run run-123-a)",
        ))
        .stdout(predicate::str::contains("COMPLETED"))
        .stdout(predicate::str::contains("1. ValidateOrder [completed] 100ms"))
        .stdout(predicate::str::contains("2. ProcessPayment [completed] 500ms"))
        .stdout(predicate::str::contains("approve"));
}

#[test]
fn history_json_summary_level() {
    let summary = stdout_json(xray().args(["--output", "json", "history", "order-123"]));
    assert_eq!(summary["workflow_id"], "order-123");
    assert_eq!(summary["run_id"], "run-123-a");
    assert_eq!(summary["status"], "COMPLETED");
    assert_eq!(summary["start_time"], "2024-01-15T10:00:00Z");
    assert_eq!(summary["input"], serde_json::json!({"orderId": "123"}));
    assert_eq!(summary["result"], serde_json::json!({"status": "shipped"}));

    let timeline = summary["timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[1]["activity"], "ProcessPayment");
    assert_eq!(timeline[1]["duration_ms"], 500);
    assert_eq!(
        timeline[1]["input_summary"],
        "{\"amount\":100,\"currency\":\"USD\"}"
    );
    assert!(timeline[1].get("input").is_none());

    assert_eq!(summary["signals_received"][0]["name"], "approve");
    assert!(summary.get("warning").is_none());
}

#[test]
fn history_standard_level_carries_full_values() {
    let summary = stdout_json(xray().args([
        "--output",
        "json",
        "history",
        "order-123",
        "--detail",
        "standard",
    ]));
    let step = &summary["timeline"][1];
    assert_eq!(
        step["input"],
        serde_json::json!({"amount": 100, "currency": "USD"})
    );
    assert_eq!(step["output"]["transactionId"], "tx-1");
    assert!(step.get("input_summary").is_none());
}

#[test]
fn history_of_failed_execution() {
    let summary = stdout_json(xray().args(["--output", "json", "history", "order-456"]));
    assert_eq!(summary["status"], "FAILED");
    assert_eq!(summary["failure"]["message"], "payment failed");
    assert_eq!(summary["failure"]["cause"]["message"], "Card declined");
    assert_eq!(summary["failure"]["cause"]["type"], "PaymentDeclined");

    let step = &summary["timeline"][1];
    assert_eq!(step["status"], "failed");
    assert_eq!(step["retries"], 2);
    assert_eq!(step["failure"], "Card declined");
}

#[test]
fn history_full_level_dumps_non_internal_events() {
    let summary = stdout_json(xray().args([
        "--output", "json", "history", "order-123", "--detail", "full",
    ]));
    assert_eq!(summary["status"], "FULL_HISTORY");
    assert_eq!(summary["timeline"].as_array().unwrap().len(), 9);
    assert_eq!(summary["timeline"][0]["activity"], "WorkflowExecutionStarted");
    assert_eq!(summary["timeline"][0]["status"], "event");
    assert_eq!(
        summary["warning"],
        "Full history with 21 events (9 after filtering internal events)."
    );
}

#[test]
fn history_event_type_filter() {
    let summary = stdout_json(xray().args([
        "--output",
        "json",
        "history",
        "order-123",
        "--event-types",
        "ActivityTaskScheduled,ActivityTaskStarted",
    ]));
    let timeline = summary["timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 2);
    assert!(timeline.iter().all(|s| s["status"] == "started"));
}

#[test]
fn history_unknown_workflow_exits_1() {
    xray()
        .args(["history", "order-999"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "No workflow found with ID 'order-999'",
        ));
}

#[test]
fn history_unknown_workflow_json_error() {
    let output = xray()
        .args(["--output", "json", "history", "order-999"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let err: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert!(err["error"]
        .as_str()
        .unwrap()
        .starts_with("No workflow found with ID 'order-999'"));
}

#[test]
fn history_quiet_suppresses_errors() {
    xray()
        .args(["--quiet", "history", "order-999"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::is_empty());
}

#[test]
fn history_rejects_unknown_detail_level() {
    xray()
        .args(["history", "order-123", "--detail", "verbose"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown detail level 'verbose'"));
}

#[test]
fn history_specific_run_falls_back_to_latest_file() {
    xray()
        .args(["history", "order-123", "--run-id", "run-123-a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(run run-123-a)"));

    xray()
        .args(["history", "order-123", "--run-id", "run-123-z"])
        .assert()
        .failure()
        .code(1);
}

// ──────────────────────────────────────────────
// 3. compare
// ──────────────────────────────────────────────

#[test]
fn compare_reports_divergences_and_exits_0() {
    let cmp = stdout_json(xray().args(["--output", "json", "compare", "order-123", "order-456"]));
    assert_eq!(cmp["execution_a"]["status"], "COMPLETED");
    assert_eq!(cmp["execution_b"]["status"], "FAILED");
    assert_eq!(cmp["same_workflow_type"], true);

    let divergences = cmp["divergences"].as_array().unwrap();
    assert!(divergences
        .iter()
        .any(|d| d["activity"] == "ValidateOrder" && d["field"] == "input.orderId"));
    assert!(divergences.iter().any(|d| d["activity"] == "ProcessPayment"
        && d["field"] == "status"
        && d["value_a"] == "completed"
        && d["value_b"] == "failed"));
    assert!(divergences
        .iter()
        .any(|d| d["field"] == "retries" && d["value_b"] == 2));

    assert_eq!(
        cmp["structural_differences"]["different_execution_order"],
        false
    );
    assert_eq!(cmp["signals"]["signals_only_in_a"], serde_json::json!(["approve"]));
}

#[test]
fn compare_text_output() {
    xray()
        .args(["compare", "order-123", "order-456"])
        .assert()
        .success()
        .stdout(predicate::str::contains("A: OrderWorkflow order-123 [COMPLETED]"))
        .stdout(predicate::str::contains("B: OrderWorkflow order-456 [FAILED]"))
        .stdout(predicate::str::contains("- signal approve (only in A)"));
}

#[test]
fn compare_with_itself_has_no_divergences() {
    xray()
        .args(["compare", "order-123", "order-123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No divergences found."));
}

#[test]
fn compare_with_missing_side_exits_1() {
    xray()
        .args(["compare", "order-123", "order-999"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("order-999"));
}

// ──────────────────────────────────────────────
// 4. list
// ──────────────────────────────────────────────

#[test]
fn list_newest_first() {
    let page = stdout_json(xray().args(["--output", "json", "list"]));
    let ids: Vec<&str> = page["workflows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["workflow_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["order-456", "order-123", "refund-1"]);
    assert_eq!(page["total_count"], 3);
    assert_eq!(page["has_more"], false);
}

#[test]
fn list_filters_by_status_and_type() {
    let page = stdout_json(xray().args(["--output", "json", "list", "--status", "running"]));
    assert_eq!(page["workflows"][0]["workflow_id"], "refund-1");
    assert_eq!(page["workflows"][0]["task_queue"], "refunds");
    assert_eq!(page["total_count"], 1);

    let page = stdout_json(xray().args([
        "--output",
        "json",
        "list",
        "--workflow-type",
        "OrderWorkflow",
        "--limit",
        "1",
    ]));
    assert_eq!(page["workflows"][0]["workflow_id"], "order-456");
    assert_eq!(page["has_more"], true);
}

#[test]
fn list_text_output() {
    xray()
        .args(["list", "--limit", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("order-456"))
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("more available"));
}

#[test]
fn list_unknown_namespace_exits_1() {
    xray()
        .args(["--namespace", "nowhere", "list"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Namespace not found: 'nowhere'"));
}

#[test]
fn list_reads_namespace_from_env() {
    let tmp = TempDir::new().unwrap();
    let staging = tmp.path().join("staging");
    fs::create_dir_all(&staging).unwrap();
    fs::copy(
        fixtures_dir().join("default/refund-1.json"),
        staging.join("refund-1.json"),
    )
    .unwrap();

    xray()
        .env("XRAY_HISTORY_DIR", tmp.path())
        .env("TEMPORAL_NAMESPACE", "staging")
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("refund-1"))
        .stdout(predicate::str::contains("RefundWorkflow"));
}

#[test]
fn list_empty_namespace_text() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("default")).unwrap();

    xray()
        .args(["--history-dir", tmp.path().to_str().unwrap(), "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No executions found"));
}

// ──────────────────────────────────────────────
// 5. events
// ──────────────────────────────────────────────

#[test]
fn events_prints_code_table() {
    xray()
        .arg("events")
        .assert()
        .success()
        .stdout(predicate::str::contains("  1  WorkflowExecutionStarted"))
        .stdout(predicate::str::contains(" 40  UpsertWorkflowSearchAttributes"))
        .stdout(predicate::str::contains("WorkflowTaskScheduled  (internal)"));
}

#[test]
fn events_json_has_forty_entries() {
    let table = stdout_json(xray().args(["--output", "json", "events"]));
    let table = table.as_array().unwrap();
    assert_eq!(table.len(), 40);
    assert_eq!(table[9]["code"], 10);
    assert_eq!(table[9]["name"], "ActivityTaskScheduled");
    assert_eq!(table[4]["internal"], true);
}
