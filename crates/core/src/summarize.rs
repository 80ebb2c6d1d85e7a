//! History summarization: raw events into an [`ExecutionSummary`].

use crate::grouping::{
    filter_by_event_types, filter_internal_events, group_activity_events, ActivityExecutionGroup,
};
use crate::payload::decode_many;
use crate::summary::*;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use xray_history::{EventAttributes, EventType, FailureRecord, HistoryEvent};

/// Payload size above which summary-level decoding truncates.
pub const SUMMARY_TRUNCATE_BYTES: usize = 10240;

/// Histories longer than this carry an advisory warning.
pub const LARGE_HISTORY_EVENTS: usize = 10000;

/// Maximum length of an `input_summary` / `output_summary` string.
pub const VALUE_SUMMARY_CHARS: usize = 200;

/// Summarize one execution's history.
///
/// `event_types`, when non-empty, restricts which activity lifecycle events
/// feed the timeline. Workflow start/terminal detection, signals, timers
/// and child workflows always read the full event list.
pub fn summarize(
    workflow_id: &str,
    run_id: &str,
    events: &[HistoryEvent],
    detail: DetailLevel,
    event_types: Option<&[String]>,
) -> ExecutionSummary {
    if detail == DetailLevel::Full {
        return full_history(workflow_id, run_id, events);
    }

    let truncate_at = match detail {
        DetailLevel::Summary => Some(SUMMARY_TRUNCATE_BYTES),
        _ => None,
    };

    let start = find_event(events, EventType::WorkflowExecutionStarted);
    let (workflow_type, input) = start_details(start, truncate_at);

    let mut status = WorkflowStatus::Running;
    let mut result = Value::Null;
    let mut failure = None;
    let mut close_time = None;

    if let Some(terminal) = events.iter().find(|e| e.event_type.is_workflow_terminal()) {
        close_time = terminal.time_rfc3339();
        match &terminal.attributes {
            EventAttributes::WorkflowExecutionCompleted(attrs) => {
                status = WorkflowStatus::Completed;
                result = decode_many(attrs.result.as_deref(), truncate_at);
            }
            EventAttributes::WorkflowExecutionFailed(attrs) => {
                status = WorkflowStatus::Failed;
                failure = attrs.failure.as_ref().map(failure_info);
            }
            _ => {
                status = match terminal.event_type {
                    EventType::WorkflowExecutionCompleted => WorkflowStatus::Completed,
                    EventType::WorkflowExecutionFailed => WorkflowStatus::Failed,
                    EventType::WorkflowExecutionTimedOut => WorkflowStatus::TimedOut,
                    EventType::WorkflowExecutionCanceled => WorkflowStatus::Canceled,
                    _ => WorkflowStatus::Terminated,
                };
            }
        }
    }

    let groups = match event_types {
        Some(types) if !types.is_empty() => {
            group_activity_events(filter_by_event_types(events, types))
        }
        _ => group_activity_events(events),
    };
    let timeline = build_timeline(&groups, detail, truncate_at);

    let warning = if events.len() > LARGE_HISTORY_EVENTS {
        warn!(
            workflow_id,
            events = events.len(),
            "history exceeds {} events",
            LARGE_HISTORY_EVENTS
        );
        Some(format!(
            "This workflow has {} events. The summary may take a moment to generate.",
            events.len()
        ))
    } else {
        None
    };

    debug!(
        workflow_id,
        run_id,
        events = events.len(),
        steps = timeline.len(),
        status = %status,
        "summarized history"
    );

    ExecutionSummary {
        workflow_id: workflow_id.to_string(),
        run_id: run_id.to_string(),
        workflow_type,
        status,
        start_time: start.and_then(HistoryEvent::time_rfc3339).unwrap_or_default(),
        close_time,
        input,
        result,
        failure,
        timeline,
        signals_received: extract_signals(events, truncate_at),
        timers_fired: extract_timers(events),
        child_workflows: extract_child_workflows(events),
        warning,
    }
}

/// Raw event dump: every non-internal event becomes one step.
fn full_history(workflow_id: &str, run_id: &str, events: &[HistoryEvent]) -> ExecutionSummary {
    let filtered = filter_internal_events(events);
    let start = find_event(events, EventType::WorkflowExecutionStarted);
    let (workflow_type, input) = start_details(start, None);

    let timeline = filtered
        .iter()
        .enumerate()
        .map(|(i, event)| TimelineStep {
            step: i + 1,
            activity: event.name(),
            status: ActivityStatus::Event,
            duration_ms: None,
            retries: None,
            input_summary: None,
            output_summary: None,
            input: Some(Value::String(event.to_string())),
            output: None,
            failure: None,
        })
        .collect();

    ExecutionSummary {
        workflow_id: workflow_id.to_string(),
        run_id: run_id.to_string(),
        workflow_type,
        status: WorkflowStatus::FullHistory,
        start_time: start.and_then(HistoryEvent::time_rfc3339).unwrap_or_default(),
        close_time: None,
        input,
        result: Value::Null,
        failure: None,
        timeline,
        signals_received: Vec::new(),
        timers_fired: Vec::new(),
        child_workflows: Vec::new(),
        warning: Some(format!(
            "Full history with {} events ({} after filtering internal events).",
            events.len(),
            filtered.len()
        )),
    }
}

fn find_event(events: &[HistoryEvent], event_type: EventType) -> Option<&HistoryEvent> {
    events.iter().find(|e| e.event_type == event_type)
}

fn start_details(start: Option<&HistoryEvent>, truncate_at: Option<usize>) -> (String, Value) {
    match start.map(|e| &e.attributes) {
        Some(EventAttributes::WorkflowExecutionStarted(attrs)) => (
            attrs
                .workflow_type
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            decode_many(attrs.input.as_deref(), truncate_at),
        ),
        _ => ("Unknown".to_string(), Value::Null),
    }
}

fn build_timeline(
    groups: &[ActivityExecutionGroup<'_>],
    detail: DetailLevel,
    truncate_at: Option<usize>,
) -> Vec<TimelineStep> {
    groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let duration_ms = match (group.scheduled, group.end_event()) {
                (Some(scheduled), Some(end)) => duration_between(scheduled, end),
                _ => None,
            };

            let input = match group.scheduled.map(|e| &e.attributes) {
                Some(EventAttributes::ActivityTaskScheduled(attrs)) => {
                    decode_many(attrs.input.as_deref(), truncate_at)
                }
                _ => Value::Null,
            };

            let mut output = Value::Null;
            let mut failure = None;
            let status = if let Some(completed) = group.completed {
                if let EventAttributes::ActivityTaskCompleted(attrs) = &completed.attributes {
                    output = decode_many(attrs.result.as_deref(), truncate_at);
                }
                ActivityStatus::Completed
            } else if let Some(failed) = group.failed {
                let message = match &failed.attributes {
                    EventAttributes::ActivityTaskFailed(attrs) => {
                        attrs.failure.as_ref().and_then(|f| f.message.clone())
                    }
                    _ => None,
                };
                failure = Some(message.unwrap_or_else(|| "Unknown error".to_string()));
                ActivityStatus::Failed
            } else if group.timed_out.is_some() {
                ActivityStatus::TimedOut
            } else if group.canceled.is_some() {
                ActivityStatus::Canceled
            } else if group.started.is_some() {
                ActivityStatus::Started
            } else {
                ActivityStatus::Scheduled
            };

            let attempt = match group.started.map(|e| &e.attributes) {
                Some(EventAttributes::ActivityTaskStarted(attrs)) => attrs.attempt.unwrap_or(1),
                _ => 1,
            };
            let retries = (attempt > 1).then(|| attempt - 1);

            let mut step = TimelineStep {
                step: i + 1,
                activity: group.activity_type.clone(),
                status,
                duration_ms,
                retries,
                input_summary: None,
                output_summary: None,
                input: None,
                output: None,
                failure,
            };
            if detail == DetailLevel::Summary {
                step.input_summary = Some(value_summary(&input));
                step.output_summary = Some(value_summary(&output));
            } else {
                step.input = Some(input);
                step.output = Some(output);
            }
            step
        })
        .collect()
}

/// Whole milliseconds from `start` to `end`, when both carry a time.
fn duration_between(start: &HistoryEvent, end: &HistoryEvent) -> Option<i64> {
    let start = start.event_time?.epoch_nanos();
    let end = end.event_time?.epoch_nanos();
    Some(((end - start) / 1_000_000) as i64)
}

fn failure_info(record: &FailureRecord) -> FailureInfo {
    FailureInfo {
        message: record
            .message
            .clone()
            .unwrap_or_else(|| "Unknown error".to_string()),
        failure_type: record
            .failure_type
            .clone()
            .or_else(|| record.source.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        stack_trace: record.stack_trace.clone(),
        cause: record.cause.as_deref().map(|c| Box::new(failure_info(c))),
    }
}

fn extract_signals(events: &[HistoryEvent], truncate_at: Option<usize>) -> Vec<SignalRecord> {
    events
        .iter()
        .filter_map(|e| match &e.attributes {
            EventAttributes::WorkflowExecutionSignaled(attrs) => Some(SignalRecord {
                name: attrs
                    .signal_name
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
                time: e.time_rfc3339().unwrap_or_default(),
                input: decode_many(attrs.input.as_deref(), truncate_at),
            }),
            _ => None,
        })
        .collect()
}

/// An empty timer id counts as missing on both sides, so such a timer
/// never pairs with a start and reports `"unknown"`.
fn extract_timers(events: &[HistoryEvent]) -> Vec<TimerRecord> {
    let mut starts: HashMap<&str, Option<Duration>> = HashMap::new();
    for e in events {
        if let EventAttributes::TimerStarted(attrs) = &e.attributes {
            if let Some(id) = non_empty(attrs.timer_id.as_deref()) {
                starts.insert(id, attrs.start_to_fire_timeout);
            }
        }
    }

    events
        .iter()
        .filter_map(|e| match &e.attributes {
            EventAttributes::TimerFired(attrs) => {
                let timer_id = non_empty(attrs.timer_id.as_deref()).unwrap_or("unknown");
                let timeout = starts.get(timer_id).copied().flatten();
                Some(TimerRecord {
                    timer_id: timer_id.to_string(),
                    duration: format_duration(timeout),
                    fired_time: e.time_rfc3339().unwrap_or_default(),
                })
            }
            _ => None,
        })
        .collect()
}

fn non_empty(id: Option<&str>) -> Option<&str> {
    id.filter(|id| !id.is_empty())
}

fn extract_child_workflows(events: &[HistoryEvent]) -> Vec<ChildWorkflowRecord> {
    let mut children: Vec<ChildWorkflowRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for e in events {
        let (attrs, status) = match &e.attributes {
            EventAttributes::StartChildWorkflowExecutionInitiated(attrs) => {
                let workflow_id = attrs.workflow_id.clone().unwrap_or_default();
                let record = ChildWorkflowRecord {
                    workflow_id: workflow_id.clone(),
                    workflow_type: attrs
                        .workflow_type
                        .clone()
                        .unwrap_or_else(|| "Unknown".to_string()),
                    status: ChildWorkflowStatus::Initiated,
                };
                match index.get(&workflow_id) {
                    Some(&i) => children[i] = record,
                    None => {
                        index.insert(workflow_id, children.len());
                        children.push(record);
                    }
                }
                continue;
            }
            EventAttributes::ChildWorkflowExecutionStarted(a) => (a, ChildWorkflowStatus::Started),
            EventAttributes::ChildWorkflowExecutionCompleted(a) => {
                (a, ChildWorkflowStatus::Completed)
            }
            EventAttributes::ChildWorkflowExecutionFailed(a) => (a, ChildWorkflowStatus::Failed),
            EventAttributes::ChildWorkflowExecutionCanceled(a) => {
                (a, ChildWorkflowStatus::Canceled)
            }
            EventAttributes::ChildWorkflowExecutionTimedOut(a) => {
                (a, ChildWorkflowStatus::TimedOut)
            }
            EventAttributes::ChildWorkflowExecutionTerminated(a) => {
                (a, ChildWorkflowStatus::Terminated)
            }
            _ => continue,
        };

        let workflow_id = attrs.workflow_id.as_deref().unwrap_or_default();
        if let Some(&i) = index.get(workflow_id) {
            children[i].status = status;
        }
    }

    children
}

/// Render a timer duration the way operators read it: `"90s"`, `"5m"`, `"2h"`.
///
/// Minutes and hours are rounded half-to-even; absent durations render as
/// `"unknown"`.
pub fn format_duration(duration: Option<Duration>) -> String {
    let Some(duration) = duration else {
        return "unknown".to_string();
    };
    let seconds = duration.as_secs();
    if seconds >= 3600 {
        format!("{}h", (seconds as f64 / 3600.0).round_ties_even() as u64)
    } else if seconds >= 60 {
        format!("{}m", (seconds as f64 / 60.0).round_ties_even() as u64)
    } else {
        format!("{}s", seconds)
    }
}

/// Compact JSON rendering capped at 200 characters (`null` for null).
pub fn value_summary(value: &Value) -> String {
    if value.is_null() {
        return "null".to_string();
    }
    let text = value.to_string();
    if text.chars().count() <= VALUE_SUMMARY_CHARS {
        return text;
    }
    let mut capped: String = text.chars().take(VALUE_SUMMARY_CHARS - 3).collect();
    capped.push_str("...");
    capped
}
