//! Caller layer between a history source and the core summarizer.
//!
//! The core treats an empty event list as a running execution with no
//! activity; here an empty history is a missing workflow.

use tracing::debug;
use xray_core::{compare, summarize, DetailLevel, ExecutionComparison, ExecutionSummary};
use xray_source::{ExecutionRef, HistorySource, SourceError};

/// What to summarize and how.
#[derive(Debug, Clone)]
pub(crate) struct SummaryRequest<'a> {
    pub execution: ExecutionRef,
    pub detail: DetailLevel,
    /// Empty keeps every event.
    pub event_types: &'a [String],
}

impl<'a> SummaryRequest<'a> {
    pub fn new(execution: ExecutionRef, detail: DetailLevel) -> Self {
        SummaryRequest {
            execution,
            detail,
            event_types: &[],
        }
    }
}

/// Fetch one execution's history and summarize it.
pub(crate) async fn fetch_summary(
    source: &dyn HistorySource,
    request: &SummaryRequest<'_>,
) -> Result<ExecutionSummary, SourceError> {
    let execution = &request.execution;
    let events = source.fetch_history(execution).await?;
    if events.is_empty() {
        return Err(SourceError::NotFound {
            workflow_id: execution.workflow_id.clone(),
        });
    }

    let run_id = match &execution.run_id {
        Some(run_id) => run_id.clone(),
        None => source.describe(execution).await?.run_id,
    };
    debug!(%execution, run_id = %run_id, events = events.len(), "summarizing");

    let event_types = (!request.event_types.is_empty()).then_some(request.event_types);
    Ok(summarize(
        &execution.workflow_id,
        &run_id,
        &events,
        request.detail,
        event_types,
    ))
}

/// Fetch both executions concurrently at standard detail and compare them.
pub(crate) async fn compare_executions(
    source: &dyn HistorySource,
    a: ExecutionRef,
    b: ExecutionRef,
) -> Result<ExecutionComparison, SourceError> {
    let request_a = SummaryRequest::new(a, DetailLevel::Standard);
    let request_b = SummaryRequest::new(b, DetailLevel::Standard);
    let (summary_a, summary_b) = tokio::try_join!(
        fetch_summary(source, &request_a),
        fetch_summary(source, &request_b)
    )?;
    Ok(compare(&summary_a, &summary_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use xray_core::WorkflowStatus;
    use xray_history::from_history_json;
    use xray_source::MemorySource;

    fn history(run_id: &str, workflow_type: &str, amount: i64) -> Vec<xray_history::HistoryEvent> {
        from_history_json(&json!({"events": [
            {"eventId": "1", "eventTime": "2024-01-15T10:00:00Z",
             "eventType": "EVENT_TYPE_WORKFLOW_EXECUTION_STARTED",
             "workflowExecutionStartedEventAttributes": {
                 "workflowType": {"name": workflow_type},
                 "originalExecutionRunId": run_id}},
            {"eventId": "2", "eventTime": "2024-01-15T10:00:01Z",
             "eventType": "EVENT_TYPE_ACTIVITY_TASK_SCHEDULED",
             "activityTaskScheduledEventAttributes": {
                 "activityId": "1",
                 "activityType": {"name": "Charge"},
                 "input": {"payloads": [{
                     "metadata": {"encoding": "anNvbi9wbGFpbg=="},
                     "data": base64_json(&json!({"amount": amount}))}]}}},
            {"eventId": "3", "eventTime": "2024-01-15T10:00:02Z",
             "eventType": "EVENT_TYPE_ACTIVITY_TASK_COMPLETED",
             "activityTaskCompletedEventAttributes": {"scheduledEventId": "2"}},
            {"eventId": "4", "eventTime": "2024-01-15T10:00:03Z",
             "eventType": "EVENT_TYPE_WORKFLOW_EXECUTION_COMPLETED",
             "workflowExecutionCompletedEventAttributes": {}},
        ]}))
        .unwrap()
    }

    fn base64_json(value: &serde_json::Value) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        STANDARD.encode(value.to_string())
    }

    #[tokio::test]
    async fn empty_history_is_not_found() {
        let source = MemorySource::new().with_history("default", "ghost", Vec::new());
        let request = SummaryRequest::new(ExecutionRef::latest("default", "ghost"), DetailLevel::Summary);
        let err = fetch_summary(&source, &request).await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound { ref workflow_id } if workflow_id == "ghost"));
    }

    #[tokio::test]
    async fn run_id_comes_from_the_description() {
        let source =
            MemorySource::new().with_history("default", "order-1", history("run-7", "OrderWorkflow", 100));
        let request = SummaryRequest::new(ExecutionRef::latest("default", "order-1"), DetailLevel::Summary);
        let summary = fetch_summary(&source, &request).await.unwrap();
        assert_eq!(summary.run_id, "run-7");
        assert_eq!(summary.status, WorkflowStatus::Completed);
        assert_eq!(summary.timeline.len(), 1);
    }

    #[tokio::test]
    async fn event_type_filter_is_forwarded() {
        let source =
            MemorySource::new().with_history("default", "order-1", history("run-7", "OrderWorkflow", 100));
        let only_scheduled = vec!["ActivityTaskScheduled".to_string()];
        let mut request =
            SummaryRequest::new(ExecutionRef::latest("default", "order-1"), DetailLevel::Summary);
        request.event_types = &only_scheduled;
        let summary = fetch_summary(&source, &request).await.unwrap();
        assert_eq!(summary.timeline.len(), 1);
        assert_eq!(summary.timeline[0].status, xray_core::ActivityStatus::Scheduled);
    }

    #[tokio::test]
    async fn compare_reports_input_divergence() {
        let source = MemorySource::new()
            .with_history("default", "order-1", history("run-1", "OrderWorkflow", 100))
            .with_history("default", "order-2", history("run-2", "OrderWorkflow", 250));
        let cmp = compare_executions(
            &source,
            ExecutionRef::latest("default", "order-1"),
            ExecutionRef::latest("default", "order-2"),
        )
        .await
        .unwrap();
        assert!(cmp.same_workflow_type);
        assert_eq!(cmp.report.divergences.len(), 1);
        assert_eq!(cmp.report.divergences[0].field, "input.amount");
    }

    #[tokio::test]
    async fn compare_fails_when_either_side_is_missing() {
        let source = MemorySource::new()
            .with_history("default", "order-1", history("run-1", "OrderWorkflow", 100));
        let err = compare_executions(
            &source,
            ExecutionRef::latest("default", "order-1"),
            ExecutionRef::latest("default", "order-404"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SourceError::NotFound { ref workflow_id } if workflow_id == "order-404"));
    }
}
