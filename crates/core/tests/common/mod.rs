//! History builders shared by the integration tests.
//!
//! Events are written in the engine's JSON export shape and parsed with
//! `from_history_json`, so the tests exercise the same path as real
//! exported histories.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use xray_history::{from_history_json, HistoryEvent};

pub const BASE_SECONDS: i64 = 1_705_312_800; // 2024-01-15T10:00:00Z

pub fn payloads(value: Value) -> Value {
    json!({"payloads": [{
        "metadata": {"encoding": BASE64.encode("json/plain")},
        "data": BASE64.encode(value.to_string()),
    }]})
}

/// Event time `offset_ms` after the base instant, in decomposed form.
pub fn time(offset_ms: i64) -> Value {
    let seconds = BASE_SECONDS + offset_ms / 1000;
    let nanos = (offset_ms % 1000) * 1_000_000;
    json!({"seconds": seconds.to_string(), "nanos": nanos})
}

/// Incrementally assembles an exported history.
pub struct HistoryBuilder {
    events: Vec<Value>,
}

impl HistoryBuilder {
    pub fn new() -> Self {
        HistoryBuilder { events: Vec::new() }
    }

    fn next_id(&self) -> i64 {
        self.events.len() as i64 + 1
    }

    fn push(&mut self, event_type: &str, offset_ms: i64, attrs: Value) -> i64 {
        let id = self.next_id();
        let mut key = event_type.to_string();
        key[..1].make_ascii_lowercase();
        let mut event = json!({
            "eventId": id.to_string(),
            "eventTime": time(offset_ms),
            "eventType": event_type,
        });
        event[format!("{}EventAttributes", key)] = attrs;
        self.events.push(event);
        id
    }

    pub fn started(mut self, workflow_type: &str, input: Value) -> Self {
        self.push(
            "WorkflowExecutionStarted",
            0,
            json!({
                "workflowType": {"name": workflow_type},
                "taskQueue": {"name": "orders"},
                "input": payloads(input),
            }),
        );
        self
    }

    pub fn workflow_task(mut self, offset_ms: i64) -> Self {
        self.push("WorkflowTaskScheduled", offset_ms, json!({}));
        self.push("WorkflowTaskStarted", offset_ms, json!({}));
        self.push("WorkflowTaskCompleted", offset_ms, json!({}));
        self
    }

    /// Schedules, starts and completes one activity.
    pub fn activity(
        mut self,
        activity_id: &str,
        activity_type: &str,
        input: Value,
        result: Value,
        scheduled_ms: i64,
        completed_ms: i64,
    ) -> Self {
        let scheduled = self.schedule(activity_id, activity_type, input, scheduled_ms);
        self.push(
            "ActivityTaskStarted",
            scheduled_ms + 1,
            json!({"scheduledEventId": scheduled.to_string(), "attempt": 1}),
        );
        self.push(
            "ActivityTaskCompleted",
            completed_ms,
            json!({"scheduledEventId": scheduled.to_string(), "result": payloads(result)}),
        );
        self
    }

    /// Schedules, starts (at `attempt`) and fails one activity.
    pub fn failed_activity(
        mut self,
        activity_id: &str,
        activity_type: &str,
        message: &str,
        attempt: i64,
        scheduled_ms: i64,
        failed_ms: i64,
    ) -> Self {
        let scheduled = self.schedule(activity_id, activity_type, json!({}), scheduled_ms);
        self.push(
            "ActivityTaskStarted",
            scheduled_ms + 1,
            json!({"scheduledEventId": scheduled.to_string(), "attempt": attempt}),
        );
        self.push(
            "ActivityTaskFailed",
            failed_ms,
            json!({
                "scheduledEventId": scheduled.to_string(),
                "failure": {"message": message, "applicationFailureInfo": {"type": "ActivityError"}},
            }),
        );
        self
    }

    pub fn scheduled_only(mut self, activity_id: &str, activity_type: &str, offset_ms: i64) -> Self {
        self.schedule(activity_id, activity_type, json!(null), offset_ms);
        self
    }

    fn schedule(&mut self, activity_id: &str, activity_type: &str, input: Value, offset_ms: i64) -> i64 {
        let mut attrs = json!({
            "activityId": activity_id,
            "activityType": {"name": activity_type},
        });
        if !input.is_null() {
            attrs["input"] = payloads(input);
        }
        self.push("ActivityTaskScheduled", offset_ms, attrs)
    }

    pub fn signal(mut self, name: &str, input: Value, offset_ms: i64) -> Self {
        self.push(
            "WorkflowExecutionSignaled",
            offset_ms,
            json!({"signalName": name, "input": payloads(input)}),
        );
        self
    }

    pub fn timer(mut self, timer_id: &str, timeout: &str, started_ms: i64, fired_ms: i64) -> Self {
        let started = self.push(
            "TimerStarted",
            started_ms,
            json!({"timerId": timer_id, "startToFireTimeout": timeout}),
        );
        self.push(
            "TimerFired",
            fired_ms,
            json!({"timerId": timer_id, "startedEventId": started.to_string()}),
        );
        self
    }

    pub fn completed(mut self, result: Value, offset_ms: i64) -> Self {
        self.push(
            "WorkflowExecutionCompleted",
            offset_ms,
            json!({"result": payloads(result)}),
        );
        self
    }

    pub fn failed(mut self, message: &str, cause: &str, offset_ms: i64) -> Self {
        self.push(
            "WorkflowExecutionFailed",
            offset_ms,
            json!({"failure": {
                "message": message,
                "stackTrace": "at OrderWorkflow.run",
                "applicationFailureInfo": {"type": "WorkflowError"},
                "cause": {"message": cause, "source": "TypeScriptSDK"},
            }}),
        );
        self
    }

    pub fn json(&self) -> Value {
        json!({"events": self.events})
    }

    pub fn build(self) -> Vec<HistoryEvent> {
        from_history_json(&self.json()).expect("builder produces valid history")
    }
}

/// The canonical OrderWorkflow run: one payment activity, then completion.
pub fn order_history() -> Vec<HistoryEvent> {
    HistoryBuilder::new()
        .started("OrderWorkflow", json!({"orderId": "123"}))
        .workflow_task(10)
        .activity(
            "1",
            "ProcessPayment",
            json!({"amount": 100}),
            json!({"success": true}),
            20,
            270,
        )
        .workflow_task(280)
        .completed(json!({"status": "done"}), 300)
        .build()
}
