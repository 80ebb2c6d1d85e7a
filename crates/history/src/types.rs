//! Typed structs representing workflow history events.
//!
//! Every attribute field is optional: history records exported by the
//! engine are frequently partial, and consumers treat a missing field as
//! absent rather than as an error. Payload bytes are kept opaque here;
//! decoding them into values is the consumer's concern.

use crate::event_type::EventType;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

// ── Payloads ────────────────────────────────────────────────────────

/// An opaque encoded blob attached to an event (input, result, signal args).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Payload {
    #[serde(serialize_with = "serialize_opt_bytes")]
    pub data: Option<Vec<u8>>,
    #[serde(serialize_with = "serialize_metadata")]
    pub metadata: BTreeMap<String, Vec<u8>>,
}

impl Payload {
    /// A payload carrying `value` as plain JSON.
    pub fn json(value: &serde_json::Value) -> Payload {
        Payload::encoded(value.to_string().into_bytes(), "json/plain")
    }

    /// A payload with raw `data` and the given `encoding` metadata entry.
    pub fn encoded(data: Vec<u8>, encoding: &str) -> Payload {
        let mut metadata = BTreeMap::new();
        metadata.insert("encoding".to_string(), encoding.as_bytes().to_vec());
        Payload {
            data: Some(data),
            metadata,
        }
    }

    /// Read a metadata entry as text (invalid UTF-8 is replaced).
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        self.metadata
            .get(key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

fn serialize_opt_bytes<S: Serializer>(data: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
    match data {
        Some(bytes) => s.serialize_str(&BASE64.encode(bytes)),
        None => s.serialize_none(),
    }
}

fn serialize_metadata<S: Serializer>(
    metadata: &BTreeMap<String, Vec<u8>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    let encoded: BTreeMap<&str, String> = metadata
        .iter()
        .map(|(k, v)| (k.as_str(), BASE64.encode(v)))
        .collect();
    encoded.serialize(s)
}

// ── Time ────────────────────────────────────────────────────────────

/// An event timestamp, either parsed from RFC 3339 text or carried as a
/// protobuf-style (seconds, nanos) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    DateTime(OffsetDateTime),
    Decomposed { seconds: i64, nanos: i32 },
}

impl EventTime {
    /// Nanoseconds since the Unix epoch.
    pub fn epoch_nanos(&self) -> i128 {
        match self {
            EventTime::DateTime(dt) => dt.unix_timestamp_nanos(),
            EventTime::Decomposed { seconds, nanos } => {
                i128::from(*seconds) * 1_000_000_000 + i128::from(*nanos)
            }
        }
    }

    /// Milliseconds since the Unix epoch, truncated toward zero.
    pub fn epoch_millis(&self) -> i64 {
        (self.epoch_nanos() / 1_000_000) as i64
    }

    /// Convert to a UTC date-time. Out-of-range values yield `None`.
    pub fn to_datetime(&self) -> Option<OffsetDateTime> {
        match self {
            EventTime::DateTime(dt) => Some(*dt),
            EventTime::Decomposed { .. } => {
                OffsetDateTime::from_unix_timestamp_nanos(self.epoch_nanos()).ok()
            }
        }
    }

    /// RFC 3339 rendering, or `None` when the instant cannot be represented.
    pub fn to_rfc3339(&self) -> Option<String> {
        self.to_datetime().and_then(|dt| dt.format(&Rfc3339).ok())
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.to_rfc3339() {
            Some(text) => s.serialize_str(&text),
            None => s.serialize_none(),
        }
    }
}

// ── Failures ────────────────────────────────────────────────────────

/// A failure record, possibly chained through `cause`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub failure_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<FailureRecord>>,
}

// ── Workflow attributes ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStartedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<Payload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_queue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_execution_run_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowCompletedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<Payload>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowFailedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowTerminatedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaledAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<Payload>>,
}

// ── Activity attributes ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityScheduledAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<Payload>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStartedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_event_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCompletedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_event_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<Payload>>,
}

/// Shared shape of the failed and timed-out activity events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFailureAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_event_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCanceledAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_event_id: Option<i64>,
}

// ── Timer attributes ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStartedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_to_fire_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerFiredAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_event_id: Option<i64>,
}

// ── Child workflow attributes ───────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildInitiatedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<String>,
}

/// Shared shape of every child lifecycle event after initiation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildExecutionAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<String>,
}

// ── Events ──────────────────────────────────────────────────────────

/// Type-specific attributes of a history event, one variant per modelled kind.
///
/// The variant always agrees with the event's [`EventType`]; kinds that carry
/// nothing the summarizer reads are kept as raw JSON in `Other`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventAttributes {
    WorkflowExecutionStarted(WorkflowStartedAttributes),
    WorkflowExecutionCompleted(WorkflowCompletedAttributes),
    WorkflowExecutionFailed(WorkflowFailedAttributes),
    WorkflowExecutionTimedOut,
    WorkflowExecutionCanceled,
    WorkflowExecutionTerminated(WorkflowTerminatedAttributes),
    WorkflowExecutionSignaled(SignaledAttributes),
    ActivityTaskScheduled(ActivityScheduledAttributes),
    ActivityTaskStarted(ActivityStartedAttributes),
    ActivityTaskCompleted(ActivityCompletedAttributes),
    ActivityTaskFailed(ActivityFailureAttributes),
    ActivityTaskTimedOut(ActivityFailureAttributes),
    ActivityTaskCanceled(ActivityCanceledAttributes),
    TimerStarted(TimerStartedAttributes),
    TimerFired(TimerFiredAttributes),
    StartChildWorkflowExecutionInitiated(ChildInitiatedAttributes),
    ChildWorkflowExecutionStarted(ChildExecutionAttributes),
    ChildWorkflowExecutionCompleted(ChildExecutionAttributes),
    ChildWorkflowExecutionFailed(ChildExecutionAttributes),
    ChildWorkflowExecutionCanceled(ChildExecutionAttributes),
    ChildWorkflowExecutionTimedOut(ChildExecutionAttributes),
    ChildWorkflowExecutionTerminated(ChildExecutionAttributes),
    Other(serde_json::Value),
}

impl EventAttributes {
    /// The `scheduled_event_id` back-reference carried by activity
    /// lifecycle events after scheduling.
    pub fn scheduled_event_id(&self) -> Option<i64> {
        match self {
            EventAttributes::ActivityTaskStarted(a) => a.scheduled_event_id,
            EventAttributes::ActivityTaskCompleted(a) => a.scheduled_event_id,
            EventAttributes::ActivityTaskFailed(a) | EventAttributes::ActivityTaskTimedOut(a) => {
                a.scheduled_event_id
            }
            EventAttributes::ActivityTaskCanceled(a) => a.scheduled_event_id,
            _ => None,
        }
    }
}

/// One immutable record in an execution's ordered history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub event_id: i64,
    #[serde(serialize_with = "serialize_event_type")]
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<EventTime>,
    pub attributes: EventAttributes,
}

impl HistoryEvent {
    /// Symbolic name of the event type.
    pub fn name(&self) -> String {
        self.event_type.name().into_owned()
    }

    /// Event time in RFC 3339, if present and representable.
    pub fn time_rfc3339(&self) -> Option<String> {
        self.event_time.as_ref().and_then(EventTime::to_rfc3339)
    }
}

fn serialize_event_type<S: Serializer>(t: &EventType, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&t.name())
}

/// Compact single-line JSON rendering of the event.
impl fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{} #{}", self.event_type, self.event_id),
        }
    }
}
