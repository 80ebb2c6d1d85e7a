use std::future::Future;

use super::{check, seed_executions, SeedExecution, TestResult};
use crate::{ExecutionPage, ExecutionStatus, HistorySource, ListFilter, SourceError};

pub(super) async fn run_list_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "list",
        "list_returns_latest_run_per_workflow_newest_first",
        list_returns_latest_run_per_workflow_newest_first(factory).await,
    ));
    results.push(TestResult::from_result(
        "list",
        "list_filters_by_status",
        list_filters_by_status(factory).await,
    ));
    results.push(TestResult::from_result(
        "list",
        "status_filter_sees_only_latest_runs",
        status_filter_sees_only_latest_runs(factory).await,
    ));
    results.push(TestResult::from_result(
        "list",
        "list_filters_by_workflow_type",
        list_filters_by_workflow_type(factory).await,
    ));
    results.push(TestResult::from_result(
        "list",
        "limit_cuts_page_and_reports_more",
        limit_cuts_page_and_reports_more(factory).await,
    ));
    results.push(TestResult::from_result(
        "list",
        "unknown_namespace_is_reported",
        unknown_namespace_is_reported(factory).await,
    ));

    results
}

fn ids(page: &ExecutionPage) -> Vec<&str> {
    page.workflows
        .iter()
        .map(|d| d.workflow_id.as_str())
        .collect()
}

// ── Test implementations ──────────────────────────────────────────────────────

/// order-1 appears once (as run-b, 11:00) ahead of refund-1 (09:00).
async fn list_returns_latest_run_per_workflow_newest_first<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    let page = s
        .list_executions(&ListFilter::new("default"))
        .await
        .map_err(|e| e.to_string())?;
    check(
        ids(&page) == ["order-1", "refund-1"],
        format!("expected [order-1, refund-1], got {:?}", ids(&page)),
    )?;
    check(
        page.workflows[0].run_id == "run-b",
        format!("expected order-1 at run-b, got {}", page.workflows[0].run_id),
    )?;
    check(
        page.total_count == 2 && !page.has_more,
        format!(
            "expected total_count 2 without more, got {} (has_more {})",
            page.total_count, page.has_more
        ),
    )
}

async fn list_filters_by_status<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    let mut filter = ListFilter::new("default");
    filter.status = Some(ExecutionStatus::Failed);
    let page = s
        .list_executions(&filter)
        .await
        .map_err(|e| e.to_string())?;
    check(
        ids(&page) == ["refund-1"],
        format!("expected [refund-1], got {:?}", ids(&page)),
    )
}

/// order-1's completed run-a is superseded by run-b and must not match.
async fn status_filter_sees_only_latest_runs<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    let mut filter = ListFilter::new("default");
    filter.status = Some(ExecutionStatus::Completed);
    let page = s
        .list_executions(&filter)
        .await
        .map_err(|e| e.to_string())?;
    check(
        page.workflows.is_empty(),
        format!("expected no completed executions, got {:?}", ids(&page)),
    )
}

async fn list_filters_by_workflow_type<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    let mut filter = ListFilter::new("staging");
    filter.workflow_type = Some("OrderWorkflow".to_string());
    let page = s
        .list_executions(&filter)
        .await
        .map_err(|e| e.to_string())?;
    check(
        ids(&page) == ["order-9"],
        format!("expected [order-9], got {:?}", ids(&page)),
    )?;

    filter.workflow_type = Some("RefundWorkflow".to_string());
    let page = s
        .list_executions(&filter)
        .await
        .map_err(|e| e.to_string())?;
    check(
        page.workflows.is_empty(),
        format!("expected no RefundWorkflow in staging, got {:?}", ids(&page)),
    )
}

async fn limit_cuts_page_and_reports_more<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    let mut filter = ListFilter::new("default");
    filter.limit = 1;
    let page = s
        .list_executions(&filter)
        .await
        .map_err(|e| e.to_string())?;
    check(
        ids(&page) == ["order-1"],
        format!("expected [order-1], got {:?}", ids(&page)),
    )?;
    check(
        page.has_more && page.total_count == 1,
        format!(
            "expected one result with more available, got {} (has_more {})",
            page.total_count, page.has_more
        ),
    )
}

async fn unknown_namespace_is_reported<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<SeedExecution>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(seed_executions()).await;
    match s.list_executions(&ListFilter::new("nowhere")).await {
        Err(SourceError::NamespaceNotFound { namespace }) if namespace == "nowhere" => Ok(()),
        Err(e) => Err(format!("expected NamespaceNotFound, got {e}")),
        Ok(page) => Err(format!("expected NamespaceNotFound, got {:?}", ids(&page))),
    }
}
