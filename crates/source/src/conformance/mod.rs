//! Conformance test suite for `HistorySource` implementations.
//!
//! A backend-agnostic suite that any `HistorySource` can run to verify it
//! honours the trait's contract:
//!
//! - **Fetch**: latest-run selection, explicit run ids, namespace isolation
//! - **Describe**: descriptions agree with the fetched history
//! - **List**: latest runs only, filters, newest-first order, page limits
//!
//! # Usage
//!
//! Backends call [`run_conformance_suite`] with a factory that builds a
//! fresh source holding exactly the given seed executions. Seeds for the
//! same workflow arrive oldest first; the last one is the latest run.
//!
//! ```ignore
//! use xray_source::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|seeds| async move {
//!         let mut source = MemorySource::new();
//!         for seed in seeds {
//!             source.insert(&seed.namespace, &seed.workflow_id, seed.events());
//!         }
//!         source
//!     })
//!     .await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod fetch;
mod list;

use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use xray_history::{from_history_json, HistoryEvent};

use crate::HistorySource;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (`fetch`, `describe`, `list`).
    pub category: String,
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in self.results.iter().filter(|r| !r.passed) {
            writeln!(
                f,
                "  FAIL [{}/{}]: {}",
                r.category,
                r.name,
                r.message.as_deref().unwrap_or("(no message)")
            )?;
        }
        Ok(())
    }
}

/// One exported run the factory must make available.
#[derive(Debug, Clone)]
pub struct SeedExecution {
    pub namespace: String,
    pub workflow_id: String,
    pub run_id: String,
    /// The run's history in exported JSON form (`{"events": [...]}`).
    pub history: Value,
}

impl SeedExecution {
    /// The seed's history as typed events.
    pub fn events(&self) -> Vec<HistoryEvent> {
        from_history_json(&self.history).unwrap_or_default()
    }
}

/// Run the full conformance suite against a history source.
///
/// The `factory` is called once per test with the seed set, so every test
/// starts from an identical source.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(fetch::run_fetch_tests(&factory).await);
    results.extend(list::run_list_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Seed data ────────────────────────────────────────────────────────────────

/// The fixed seed set every test runs against.
///
/// | namespace | workflow  | runs (oldest first)                      |
/// |-----------|-----------|------------------------------------------|
/// | default   | order-1   | run-a COMPLETED 10:00, run-b RUNNING 11:00 |
/// | default   | refund-1  | run-c FAILED 09:00                        |
/// | staging   | order-9   | run-z COMPLETED 12:00                     |
pub fn seed_executions() -> Vec<SeedExecution> {
    vec![
        seed("default", "order-1", "run-a", "OrderWorkflow", "10:00:00", Some("COMPLETED")),
        seed("default", "order-1", "run-b", "OrderWorkflow", "11:00:00", None),
        seed("default", "refund-1", "run-c", "RefundWorkflow", "09:00:00", Some("FAILED")),
        seed("staging", "order-9", "run-z", "OrderWorkflow", "12:00:00", Some("COMPLETED")),
    ]
}

fn seed(
    namespace: &str,
    workflow_id: &str,
    run_id: &str,
    workflow_type: &str,
    start: &str,
    terminal: Option<&str>,
) -> SeedExecution {
    let mut events = vec![json!({
        "eventId": "1",
        "eventTime": format!("2024-01-15T{}Z", start),
        "eventType": "EVENT_TYPE_WORKFLOW_EXECUTION_STARTED",
        "workflowExecutionStartedEventAttributes": {
            "workflowType": {"name": workflow_type},
            "taskQueue": {"name": "conformance"},
            "originalExecutionRunId": run_id,
        },
    })];
    match terminal {
        Some("COMPLETED") => events.push(json!({
            "eventId": "2",
            "eventTime": format!("2024-01-15T{}.500Z", start),
            "eventType": "EVENT_TYPE_WORKFLOW_EXECUTION_COMPLETED",
            "workflowExecutionCompletedEventAttributes": {},
        })),
        Some("FAILED") => events.push(json!({
            "eventId": "2",
            "eventTime": format!("2024-01-15T{}.500Z", start),
            "eventType": "EVENT_TYPE_WORKFLOW_EXECUTION_FAILED",
            "workflowExecutionFailedEventAttributes": {"failure": {"message": "boom"}},
        })),
        _ => {}
    }

    SeedExecution {
        namespace: namespace.to_string(),
        workflow_id: workflow_id.to_string(),
        run_id: run_id.to_string(),
        history: json!({ "events": events }),
    }
}

fn check(condition: bool, msg: impl Into<String>) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(msg.into())
    }
}
