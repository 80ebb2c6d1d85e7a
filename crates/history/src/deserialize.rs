//! Deserialization from exported history JSON into typed events.
//!
//! The main entry point is [`from_history_json`], which takes a
//! `&serde_json::Value` in the engine's JSON export shape and produces
//! an ordered `Vec<HistoryEvent>`.
//!
//! Only the event envelope (`eventId`, `eventType`) is required. Every
//! attribute lookup is permissive: missing or malformed attribute fields
//! become `None` so that partially populated exports still summarize.

use crate::event_type::EventType;
use crate::types::*;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Errors during history JSON deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// The document is not a history export at all.
    InvalidHistory(String),
    /// An event envelope is unusable.
    InvalidEvent { index: usize, message: String },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::InvalidHistory(msg) => write!(f, "invalid history: {}", msg),
            HistoryError::InvalidEvent { index, message } => {
                write!(f, "event at index {}: {}", index, message)
            }
        }
    }
}

impl std::error::Error for HistoryError {}

/// Deserialize an exported history into typed events.
///
/// Accepts either `{"events": [...]}` or a bare array of events. Event
/// order is preserved exactly as exported.
pub fn from_history_json(doc: &Value) -> Result<Vec<HistoryEvent>, HistoryError> {
    let events = match doc {
        Value::Array(arr) => arr,
        Value::Object(obj) => match obj.get("events") {
            Some(Value::Array(arr)) => arr,
            Some(_) => {
                return Err(HistoryError::InvalidHistory(
                    "'events' is not an array".to_string(),
                ))
            }
            None => {
                return Err(HistoryError::InvalidHistory(
                    "missing 'events' array".to_string(),
                ))
            }
        },
        _ => {
            return Err(HistoryError::InvalidHistory(
                "expected an object or an array".to_string(),
            ))
        }
    };

    events
        .iter()
        .enumerate()
        .map(|(index, obj)| parse_event(index, obj))
        .collect()
}

/// Deserialize a single event object.
pub fn parse_event(index: usize, obj: &Value) -> Result<HistoryEvent, HistoryError> {
    let event_id = obj
        .get("eventId")
        .and_then(as_i64)
        .ok_or_else(|| HistoryError::InvalidEvent {
            index,
            message: "missing or invalid 'eventId'".to_string(),
        })?;

    let event_type = match obj.get("eventType") {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| HistoryError::InvalidEvent {
                index,
                message: format!("invalid 'eventType' code {}", n),
            })
            .and_then(|code| event_type_code(index, code))?,
        Some(Value::String(s)) => match EventType::from_name(s) {
            Some(t) => t,
            None => s
                .parse::<i64>()
                .map_err(|_| HistoryError::InvalidEvent {
                    index,
                    message: format!("unrecognized 'eventType' '{}'", s),
                })
                .and_then(|code| event_type_code(index, code))?,
        },
        _ => {
            return Err(HistoryError::InvalidEvent {
                index,
                message: "missing 'eventType'".to_string(),
            })
        }
    };

    let event_time = obj.get("eventTime").and_then(parse_time);
    let attributes = parse_attributes(event_type, obj);

    Ok(HistoryEvent {
        event_id,
        event_type,
        event_time,
        attributes,
    })
}

// ── Attribute dispatch ──────────────────────────────────────────────

/// JSON key holding the attribute object for `event_type`, e.g.
/// `activityTaskScheduledEventAttributes`.
fn attributes_key(event_type: EventType) -> String {
    let name = event_type.name();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!(
            "{}{}EventAttributes",
            first.to_ascii_lowercase(),
            chars.as_str()
        ),
        None => String::new(),
    }
}

fn parse_attributes(event_type: EventType, obj: &Value) -> EventAttributes {
    let attrs = obj
        .get(attributes_key(event_type))
        .cloned()
        .unwrap_or(Value::Null);
    let a = &attrs;

    match event_type {
        EventType::WorkflowExecutionStarted => {
            EventAttributes::WorkflowExecutionStarted(WorkflowStartedAttributes {
                workflow_type: named(a, "workflowType"),
                input: payloads(a, "input"),
                task_queue: named(a, "taskQueue"),
                original_execution_run_id: string(a, "originalExecutionRunId"),
            })
        }
        EventType::WorkflowExecutionCompleted => {
            EventAttributes::WorkflowExecutionCompleted(WorkflowCompletedAttributes {
                result: payloads(a, "result"),
            })
        }
        EventType::WorkflowExecutionFailed => {
            EventAttributes::WorkflowExecutionFailed(WorkflowFailedAttributes {
                failure: a.get("failure").and_then(parse_failure),
            })
        }
        EventType::WorkflowExecutionTimedOut => EventAttributes::WorkflowExecutionTimedOut,
        EventType::WorkflowExecutionCanceled => EventAttributes::WorkflowExecutionCanceled,
        EventType::WorkflowExecutionTerminated => {
            EventAttributes::WorkflowExecutionTerminated(WorkflowTerminatedAttributes {
                reason: string(a, "reason"),
            })
        }
        EventType::WorkflowExecutionSignaled => {
            EventAttributes::WorkflowExecutionSignaled(SignaledAttributes {
                signal_name: string(a, "signalName"),
                input: payloads(a, "input"),
            })
        }
        EventType::ActivityTaskScheduled => {
            EventAttributes::ActivityTaskScheduled(ActivityScheduledAttributes {
                activity_id: string(a, "activityId"),
                activity_type: named(a, "activityType"),
                input: payloads(a, "input"),
            })
        }
        EventType::ActivityTaskStarted => {
            EventAttributes::ActivityTaskStarted(ActivityStartedAttributes {
                scheduled_event_id: a.get("scheduledEventId").and_then(as_i64),
                attempt: a.get("attempt").and_then(as_i64),
            })
        }
        EventType::ActivityTaskCompleted => {
            EventAttributes::ActivityTaskCompleted(ActivityCompletedAttributes {
                scheduled_event_id: a.get("scheduledEventId").and_then(as_i64),
                result: payloads(a, "result"),
            })
        }
        EventType::ActivityTaskFailed => {
            EventAttributes::ActivityTaskFailed(activity_failure(a))
        }
        EventType::ActivityTaskTimedOut => {
            EventAttributes::ActivityTaskTimedOut(activity_failure(a))
        }
        EventType::ActivityTaskCanceled => {
            EventAttributes::ActivityTaskCanceled(ActivityCanceledAttributes {
                scheduled_event_id: a.get("scheduledEventId").and_then(as_i64),
            })
        }
        EventType::TimerStarted => EventAttributes::TimerStarted(TimerStartedAttributes {
            timer_id: string(a, "timerId"),
            start_to_fire_timeout: a.get("startToFireTimeout").and_then(parse_duration),
        }),
        EventType::TimerFired => EventAttributes::TimerFired(TimerFiredAttributes {
            timer_id: string(a, "timerId"),
            started_event_id: a.get("startedEventId").and_then(as_i64),
        }),
        EventType::StartChildWorkflowExecutionInitiated => {
            EventAttributes::StartChildWorkflowExecutionInitiated(ChildInitiatedAttributes {
                workflow_id: string(a, "workflowId"),
                workflow_type: named(a, "workflowType"),
            })
        }
        EventType::ChildWorkflowExecutionStarted => {
            EventAttributes::ChildWorkflowExecutionStarted(child_execution(a))
        }
        EventType::ChildWorkflowExecutionCompleted => {
            EventAttributes::ChildWorkflowExecutionCompleted(child_execution(a))
        }
        EventType::ChildWorkflowExecutionFailed => {
            EventAttributes::ChildWorkflowExecutionFailed(child_execution(a))
        }
        EventType::ChildWorkflowExecutionCanceled => {
            EventAttributes::ChildWorkflowExecutionCanceled(child_execution(a))
        }
        EventType::ChildWorkflowExecutionTimedOut => {
            EventAttributes::ChildWorkflowExecutionTimedOut(child_execution(a))
        }
        EventType::ChildWorkflowExecutionTerminated => {
            EventAttributes::ChildWorkflowExecutionTerminated(child_execution(a))
        }
        _ => EventAttributes::Other(attrs),
    }
}

fn activity_failure(a: &Value) -> ActivityFailureAttributes {
    ActivityFailureAttributes {
        scheduled_event_id: a.get("scheduledEventId").and_then(as_i64),
        failure: a.get("failure").and_then(parse_failure),
    }
}

fn child_execution(a: &Value) -> ChildExecutionAttributes {
    let execution = a.get("workflowExecution");
    ChildExecutionAttributes {
        workflow_id: execution.and_then(|e| string(e, "workflowId")),
        run_id: execution.and_then(|e| string(e, "runId")),
        workflow_type: named(a, "workflowType"),
    }
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn string(obj: &Value, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// `{"name": "..."}` wrappers used for workflow, activity and queue types.
fn named(obj: &Value, field: &str) -> Option<String> {
    obj.get(field).and_then(|v| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(_) => string(v, "name"),
        _ => None,
    })
}

/// Integers arrive as JSON numbers or, for int64 fields, decimal strings.
fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn payloads(obj: &Value, field: &str) -> Option<Vec<Payload>> {
    let list = obj.get(field)?;
    let arr = match list {
        Value::Object(_) => list.get("payloads")?.as_array()?,
        Value::Array(arr) => arr,
        _ => return None,
    };
    Some(arr.iter().map(parse_payload).collect())
}

fn parse_payload(obj: &Value) -> Payload {
    let data = obj
        .get("data")
        .and_then(|v| v.as_str())
        .and_then(|s| BASE64.decode(s).ok());

    let metadata = obj
        .get("metadata")
        .and_then(|m| m.as_object())
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| {
                    let bytes = BASE64.decode(v.as_str()?).ok()?;
                    Some((k.clone(), bytes))
                })
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    Payload { data, metadata }
}

fn parse_failure(obj: &Value) -> Option<FailureRecord> {
    if !obj.is_object() {
        return None;
    }
    let failure_type = obj
        .get("applicationFailureInfo")
        .and_then(|info| string(info, "type"));

    Some(FailureRecord {
        message: string(obj, "message"),
        failure_type,
        source: string(obj, "source"),
        stack_trace: string(obj, "stackTrace"),
        cause: obj.get("cause").and_then(parse_failure).map(Box::new),
    })
}

/// Numeric codes outside the `i32` range cannot name any event type.
fn event_type_code(index: usize, code: i64) -> Result<EventType, HistoryError> {
    i32::try_from(code)
        .map(EventType::from_code)
        .map_err(|_| HistoryError::InvalidEvent {
            index,
            message: format!("'eventType' code {} out of range", code),
        })
}

/// RFC 3339 text or a `{seconds, nanos}` object. Whole seconds carried in
/// `nanos` move into `seconds`; an instant that overflows is absent.
fn parse_time(v: &Value) -> Option<EventTime> {
    match v {
        Value::String(s) => OffsetDateTime::parse(s, &Rfc3339)
            .ok()
            .map(EventTime::DateTime),
        Value::Object(_) => {
            let seconds = v.get("seconds").and_then(as_i64).unwrap_or(0);
            let nanos = v.get("nanos").and_then(as_i64).unwrap_or(0);
            let seconds = seconds.checked_add(nanos.div_euclid(NANOS_PER_SEC))?;
            let nanos = i32::try_from(nanos.rem_euclid(NANOS_PER_SEC)).ok()?;
            Some(EventTime::Decomposed { seconds, nanos })
        }
        _ => None,
    }
}

/// Protobuf JSON durations (`"90s"`, `"1.5s"`) or `{seconds, nanos}`.
fn parse_duration(v: &Value) -> Option<Duration> {
    match v {
        Value::String(s) => {
            let secs: f64 = s.strip_suffix('s')?.parse().ok()?;
            Duration::try_from_secs_f64(secs).ok()
        }
        Value::Object(_) => {
            let seconds = v.get("seconds").and_then(as_i64).unwrap_or(0);
            let nanos = v.get("nanos").and_then(as_i64).unwrap_or(0);
            let seconds = u64::try_from(seconds).ok()?;
            let nanos = u64::try_from(nanos).ok()?;
            Duration::from_secs(seconds).checked_add(Duration::from_nanos(nanos))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn b64(s: &str) -> String {
        BASE64.encode(s.as_bytes())
    }

    fn json_payload(s: &str) -> Value {
        json!({"metadata": {"encoding": b64("json/plain")}, "data": b64(s)})
    }

    #[test]
    fn test_empty_history() {
        let events = from_history_json(&json!({"events": []})).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_bare_array_accepted() {
        let doc = json!([{"eventId": 1, "eventType": 1}]);
        let events = from_history_json(&doc).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::WorkflowExecutionStarted);
    }

    #[test]
    fn test_missing_events_array() {
        let result = from_history_json(&json!({"history": []}));
        assert_eq!(
            result.unwrap_err(),
            HistoryError::InvalidHistory("missing 'events' array".to_string())
        );
    }

    #[test]
    fn test_scalar_document_rejected() {
        assert!(from_history_json(&json!("nope")).is_err());
    }

    #[test]
    fn test_missing_event_id() {
        let result = from_history_json(&json!([{"eventType": 1}]));
        match result.unwrap_err() {
            HistoryError::InvalidEvent { index, .. } => assert_eq!(index, 0),
            other => panic!("expected InvalidEvent, got {:?}", other),
        }
    }

    #[test]
    fn test_event_type_spellings() {
        let doc = json!([
            {"eventId": "1", "eventType": "EVENT_TYPE_WORKFLOW_EXECUTION_STARTED"},
            {"eventId": "2", "eventType": "WorkflowTaskScheduled"},
            {"eventId": "3", "eventType": 10},
            {"eventId": "4", "eventType": 77},
        ]);
        let events = from_history_json(&doc).unwrap();
        assert_eq!(events[0].event_type, EventType::WorkflowExecutionStarted);
        assert_eq!(events[1].event_type, EventType::WorkflowTaskScheduled);
        assert_eq!(events[2].event_type, EventType::ActivityTaskScheduled);
        assert_eq!(events[3].name(), "UnknownEventType(77)");
        assert_eq!(events[3].event_id, 4);
    }

    #[test]
    fn test_unrecognized_event_type_name() {
        let result = from_history_json(&json!([{"eventId": 1, "eventType": "Bogus"}]));
        assert!(matches!(
            result.unwrap_err(),
            HistoryError::InvalidEvent { index: 0, .. }
        ));
    }

    #[test]
    fn test_event_type_code_out_of_range() {
        for code in [json!(4294967297_i64), json!("4294967297")] {
            let result = from_history_json(&json!([{"eventId": 1, "eventType": code}]));
            match result.unwrap_err() {
                HistoryError::InvalidEvent { index, message } => {
                    assert_eq!(index, 0);
                    assert_eq!(message, "'eventType' code 4294967297 out of range");
                }
                other => panic!("expected InvalidEvent, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_numeric_string_code_matches_number() {
        let doc = json!([
            {"eventId": 1, "eventType": "77"},
            {"eventId": 2, "eventType": 77},
        ]);
        let events = from_history_json(&doc).unwrap();
        assert_eq!(events[0].event_type, events[1].event_type);
        assert_eq!(events[0].name(), "UnknownEventType(77)");
    }

    #[test]
    fn test_workflow_started_attributes() {
        let doc = json!([{
            "eventId": "1",
            "eventTime": "2024-01-15T10:00:00Z",
            "eventType": "EVENT_TYPE_WORKFLOW_EXECUTION_STARTED",
            "workflowExecutionStartedEventAttributes": {
                "workflowType": {"name": "OrderWorkflow"},
                "taskQueue": {"name": "orders", "kind": "TASK_QUEUE_KIND_NORMAL"},
                "input": {"payloads": [json_payload(r#"{"orderId":"123"}"#)]},
                "originalExecutionRunId": "run-1"
            }
        }]);
        let events = from_history_json(&doc).unwrap();
        let event = &events[0];
        assert!(event.event_time.is_some());
        match &event.attributes {
            EventAttributes::WorkflowExecutionStarted(a) => {
                assert_eq!(a.workflow_type.as_deref(), Some("OrderWorkflow"));
                assert_eq!(a.task_queue.as_deref(), Some("orders"));
                assert_eq!(a.original_execution_run_id.as_deref(), Some("run-1"));
                let input = a.input.as_ref().unwrap();
                assert_eq!(input.len(), 1);
                assert_eq!(input[0].data.as_deref(), Some(br#"{"orderId":"123"}"#.as_slice()));
                assert_eq!(input[0].metadata_str("encoding").as_deref(), Some("json/plain"));
            }
            other => panic!("unexpected attributes {:?}", other),
        }
    }

    #[test]
    fn test_missing_attribute_object_yields_empty_variant() {
        let doc = json!([{"eventId": 5, "eventType": "ActivityTaskScheduled"}]);
        let events = from_history_json(&doc).unwrap();
        assert_eq!(
            events[0].attributes,
            EventAttributes::ActivityTaskScheduled(ActivityScheduledAttributes::default())
        );
    }

    #[test]
    fn test_activity_failed_with_nested_cause() {
        let doc = json!([{
            "eventId": "7",
            "eventType": "ActivityTaskFailed",
            "activityTaskFailedEventAttributes": {
                "scheduledEventId": "5",
                "failure": {
                    "message": "card declined",
                    "source": "GoSDK",
                    "stackTrace": "at charge()",
                    "applicationFailureInfo": {"type": "PaymentError"},
                    "cause": {"message": "gateway timeout"}
                }
            }
        }]);
        let events = from_history_json(&doc).unwrap();
        match &events[0].attributes {
            EventAttributes::ActivityTaskFailed(a) => {
                assert_eq!(a.scheduled_event_id, Some(5));
                let failure = a.failure.as_ref().unwrap();
                assert_eq!(failure.message.as_deref(), Some("card declined"));
                assert_eq!(failure.failure_type.as_deref(), Some("PaymentError"));
                assert_eq!(failure.source.as_deref(), Some("GoSDK"));
                let cause = failure.cause.as_ref().unwrap();
                assert_eq!(cause.message.as_deref(), Some("gateway timeout"));
                assert!(cause.cause.is_none());
            }
            other => panic!("unexpected attributes {:?}", other),
        }
    }

    #[test]
    fn test_decomposed_time_and_duration() {
        let doc = json!([{
            "eventId": 3,
            "eventType": 17,
            "eventTime": {"seconds": "1700000000", "nanos": 500000000},
            "timerStartedEventAttributes": {
                "timerId": "t-1",
                "startToFireTimeout": "90s"
            }
        }]);
        let events = from_history_json(&doc).unwrap();
        assert_eq!(
            events[0].event_time,
            Some(EventTime::Decomposed {
                seconds: 1_700_000_000,
                nanos: 500_000_000
            })
        );
        match &events[0].attributes {
            EventAttributes::TimerStarted(a) => {
                assert_eq!(a.timer_id.as_deref(), Some("t-1"));
                assert_eq!(a.start_to_fire_timeout, Some(Duration::from_secs(90)));
            }
            other => panic!("unexpected attributes {:?}", other),
        }
    }

    #[test]
    fn test_decomposed_time_carries_whole_seconds() {
        let doc = json!([
            {"eventId": 1, "eventType": 1, "eventTime": {"seconds": 100, "nanos": 3000000000_i64}},
            {"eventId": 2, "eventType": 1, "eventTime": {"seconds": 100, "nanos": -250000000}},
            {"eventId": 3, "eventType": 1, "eventTime": {"seconds": i64::MAX, "nanos": 2000000000}},
        ]);
        let events = from_history_json(&doc).unwrap();
        assert_eq!(
            events[0].event_time,
            Some(EventTime::Decomposed { seconds: 103, nanos: 0 })
        );
        assert_eq!(events[0].event_time.as_ref().unwrap().epoch_millis(), 103_000);
        assert_eq!(events[1].event_time.as_ref().unwrap().epoch_millis(), 99_750);
        assert_eq!(events[2].event_time, None);
    }

    #[test]
    fn test_oversized_duration_nanos_do_not_wrap() {
        let doc = json!([{
            "eventId": 1,
            "eventType": 17,
            "timerStartedEventAttributes": {
                "timerId": "t-1",
                "startToFireTimeout": {"seconds": 1, "nanos": 5000000000_i64}
            }
        }]);
        let events = from_history_json(&doc).unwrap();
        match &events[0].attributes {
            EventAttributes::TimerStarted(a) => {
                assert_eq!(a.start_to_fire_timeout, Some(Duration::from_secs(6)));
            }
            other => panic!("unexpected attributes {:?}", other),
        }
    }

    #[test]
    fn test_child_execution_reads_nested_workflow_id() {
        let doc = json!([{
            "eventId": 9,
            "eventType": "ChildWorkflowExecutionCompleted",
            "childWorkflowExecutionCompletedEventAttributes": {
                "workflowExecution": {"workflowId": "child-1", "runId": "r"},
                "workflowType": {"name": "ShipWorkflow"}
            }
        }]);
        let events = from_history_json(&doc).unwrap();
        match &events[0].attributes {
            EventAttributes::ChildWorkflowExecutionCompleted(a) => {
                assert_eq!(a.workflow_id.as_deref(), Some("child-1"));
                assert_eq!(a.workflow_type.as_deref(), Some("ShipWorkflow"));
            }
            other => panic!("unexpected attributes {:?}", other),
        }
    }

    #[test]
    fn test_invalid_base64_is_absent_data() {
        let doc = json!([{
            "eventId": 1,
            "eventType": "WorkflowExecutionSignaled",
            "workflowExecutionSignaledEventAttributes": {
                "signalName": "approve",
                "input": {"payloads": [{"data": "%%%not-base64%%%"}]}
            }
        }]);
        let events = from_history_json(&doc).unwrap();
        match &events[0].attributes {
            EventAttributes::WorkflowExecutionSignaled(a) => {
                assert_eq!(a.signal_name.as_deref(), Some("approve"));
                assert_eq!(a.input.as_ref().unwrap()[0].data, None);
            }
            other => panic!("unexpected attributes {:?}", other),
        }
    }

    #[test]
    fn test_unmodelled_kind_keeps_raw_attributes() {
        let doc = json!([{
            "eventId": 4,
            "eventType": "MarkerRecorded",
            "markerRecordedEventAttributes": {"markerName": "Version"}
        }]);
        let events = from_history_json(&doc).unwrap();
        assert_eq!(
            events[0].attributes,
            EventAttributes::Other(json!({"markerName": "Version"}))
        );
    }
}
