use std::future::Future;

use super::{check, seed_executions, SeedExecution, TestResult};
use crate::{ExecutionRef, ExecutionStatus, HistorySource, SourceError};
use xray_history::EventType;

pub(super) async fn run_fetch_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "fetch",
        "fetch_without_run_id_returns_latest_run",
        fetch_without_run_id_returns_latest_run(factory).await,
    ));
    results.push(TestResult::from_result(
        "fetch",
        "fetch_with_run_id_returns_that_run",
        fetch_with_run_id_returns_that_run(factory).await,
    ));
    results.push(TestResult::from_result(
        "fetch",
        "unknown_workflow_is_not_found",
        unknown_workflow_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "fetch",
        "unknown_run_is_not_found",
        unknown_run_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "fetch",
        "namespaces_are_isolated",
        namespaces_are_isolated(factory).await,
    ));
    results.push(TestResult::from_result(
        "describe",
        "describe_reports_terminal_status",
        describe_reports_terminal_status(factory).await,
    ));
    results.push(TestResult::from_result(
        "describe",
        "describe_running_execution_has_no_close_time",
        describe_running_execution_has_no_close_time(factory).await,
    ));
    results.push(TestResult::from_result(
        "describe",
        "describe_unknown_workflow_is_not_found",
        describe_unknown_workflow_is_not_found(factory).await,
    ));

    results
}

fn expect_not_found<T>(result: Result<T, SourceError>, what: &str) -> Result<(), String> {
    match result {
        Err(SourceError::NotFound { .. }) => Ok(()),
        Err(e) => Err(format!("{what}: expected NotFound, got {e}")),
        Ok(_) => Err(format!("{what}: expected NotFound, got Ok")),
    }
}

// ── Test implementations ──────────────────────────────────────────────────────

/// Without a run id, order-1 resolves to run-b, which has not closed.
async fn fetch_without_run_id_returns_latest_run<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    let events = s
        .fetch_history(&ExecutionRef::latest("default", "order-1"))
        .await
        .map_err(|e| e.to_string())?;
    check(
        events.len() == 1,
        format!("expected 1 event in run-b, got {}", events.len()),
    )?;
    check(
        events[0].event_type == EventType::WorkflowExecutionStarted,
        format!("expected a start event, got {}", events[0].name()),
    )
}

/// An explicit run id selects the older, completed run.
async fn fetch_with_run_id_returns_that_run<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    let execution =
        ExecutionRef::latest("default", "order-1").with_run_id(Some("run-a".to_string()));
    let events = s
        .fetch_history(&execution)
        .await
        .map_err(|e| e.to_string())?;
    check(
        events.len() == 2,
        format!("expected 2 events in run-a, got {}", events.len()),
    )?;
    check(
        events[1].event_type == EventType::WorkflowExecutionCompleted,
        format!("expected run-a to complete, got {}", events[1].name()),
    )
}

async fn unknown_workflow_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    expect_not_found(
        s.fetch_history(&ExecutionRef::latest("default", "missing-1"))
            .await,
        "fetch default/missing-1",
    )
}

async fn unknown_run_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    let execution =
        ExecutionRef::latest("default", "order-1").with_run_id(Some("run-q".to_string()));
    expect_not_found(s.fetch_history(&execution).await, "fetch order-1@run-q")
}

/// A workflow id is only visible inside its own namespace.
async fn namespaces_are_isolated<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    expect_not_found(
        s.fetch_history(&ExecutionRef::latest("staging", "order-1"))
            .await,
        "fetch staging/order-1",
    )?;
    expect_not_found(
        s.fetch_history(&ExecutionRef::latest("default", "order-9"))
            .await,
        "fetch default/order-9",
    )?;
    s.fetch_history(&ExecutionRef::latest("staging", "order-9"))
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

async fn describe_reports_terminal_status<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    let d = s
        .describe(&ExecutionRef::latest("default", "refund-1"))
        .await
        .map_err(|e| e.to_string())?;
    check(
        d.status == ExecutionStatus::Failed,
        format!("expected FAILED, got {}", d.status),
    )?;
    check(
        d.workflow_type == "RefundWorkflow",
        format!("expected RefundWorkflow, got {}", d.workflow_type),
    )?;
    check(d.run_id == "run-c", format!("expected run-c, got {}", d.run_id))?;
    check(
        d.duration_ms == Some(500),
        format!("expected 500ms duration, got {:?}", d.duration_ms),
    )
}

async fn describe_running_execution_has_no_close_time<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    let d = s
        .describe(&ExecutionRef::latest("default", "order-1"))
        .await
        .map_err(|e| e.to_string())?;
    check(
        d.status == ExecutionStatus::Running,
        format!("expected RUNNING, got {}", d.status),
    )?;
    check(d.run_id == "run-b", format!("expected run-b, got {}", d.run_id))?;
    check(
        d.close_time.is_none() && d.duration_ms.is_none(),
        "running execution must not report a close time or duration",
    )
}

async fn describe_unknown_workflow_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    expect_not_found(
        s.describe(&ExecutionRef::latest("default", "missing-1"))
            .await,
        "describe default/missing-1",
    )
}
