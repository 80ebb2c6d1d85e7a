//! Output records produced by the summarizer.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How much payload data a summary carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Payloads truncated at 10 KiB and rendered as capped summary strings.
    #[default]
    Summary,
    /// Full decoded payload values.
    Standard,
    /// Raw event dump without activity grouping.
    Full,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Summary => "summary",
            DetailLevel::Standard => "standard",
            DetailLevel::Full => "full",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "summary" => Ok(DetailLevel::Summary),
            "standard" => Ok(DetailLevel::Standard),
            "full" => Ok(DetailLevel::Full),
            other => Err(format!(
                "unknown detail level '{}' (expected summary, standard or full)",
                other
            )),
        }
    }
}

/// Lifecycle status of one timeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Scheduled,
    Started,
    Completed,
    Failed,
    TimedOut,
    Canceled,
    /// A raw event in full-history mode.
    Event,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Scheduled => "scheduled",
            ActivityStatus::Started => "started",
            ActivityStatus::Completed => "completed",
            ActivityStatus::Failed => "failed",
            ActivityStatus::TimedOut => "timed_out",
            ActivityStatus::Canceled => "canceled",
            ActivityStatus::Event => "event",
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a workflow execution as derived from its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    TimedOut,
    Canceled,
    Terminated,
    FullHistory,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Running => "RUNNING",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Failed => "FAILED",
            WorkflowStatus::TimedOut => "TIMED_OUT",
            WorkflowStatus::Canceled => "CANCELED",
            WorkflowStatus::Terminated => "TERMINATED",
            WorkflowStatus::FullHistory => "FULL_HISTORY",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known status of a child workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildWorkflowStatus {
    Initiated,
    Started,
    Completed,
    Failed,
    Canceled,
    TimedOut,
    Terminated,
}

impl ChildWorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildWorkflowStatus::Initiated => "initiated",
            ChildWorkflowStatus::Started => "started",
            ChildWorkflowStatus::Completed => "completed",
            ChildWorkflowStatus::Failed => "failed",
            ChildWorkflowStatus::Canceled => "canceled",
            ChildWorkflowStatus::TimedOut => "timed_out",
            ChildWorkflowStatus::Terminated => "terminated",
        }
    }
}

/// One reconstructed activity execution (or, in full mode, one raw event).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineStep {
    pub step: usize,
    pub activity: String,
    pub status: ActivityStatus,
    pub duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl TimelineStep {
    /// The input in whichever representation this step carries.
    pub fn input_value(&self) -> Value {
        comparable(&self.input, &self.input_summary)
    }

    /// The output in whichever representation this step carries.
    pub fn output_value(&self) -> Value {
        comparable(&self.output, &self.output_summary)
    }
}

fn comparable(full: &Option<Value>, summary: &Option<String>) -> Value {
    match (full, summary) {
        (Some(v), _) if !v.is_null() => v.clone(),
        (_, Some(s)) => Value::String(s.clone()),
        _ => Value::Null,
    }
}

/// Structured workflow failure, recursively chained through `cause`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureInfo {
    pub message: String,
    #[serde(rename = "type")]
    pub failure_type: String,
    #[serde(rename = "stackTrace")]
    pub stack_trace: Option<String>,
    pub cause: Option<Box<FailureInfo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRecord {
    pub name: String,
    pub time: String,
    pub input: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerRecord {
    pub timer_id: String,
    /// Human-readable configured duration, e.g. `"5m"`.
    pub duration: String,
    pub fired_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildWorkflowRecord {
    pub workflow_id: String,
    pub workflow_type: String,
    pub status: ChildWorkflowStatus,
}

/// Structured view of one workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionSummary {
    pub workflow_id: String,
    pub run_id: String,
    pub workflow_type: String,
    pub status: WorkflowStatus,
    pub start_time: String,
    pub close_time: Option<String>,
    pub input: Value,
    pub result: Value,
    pub failure: Option<FailureInfo>,
    pub timeline: Vec<TimelineStep>,
    pub signals_received: Vec<SignalRecord>,
    pub timers_fired: Vec<TimerRecord>,
    pub child_workflows: Vec<ChildWorkflowRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ExecutionSummary {
    /// Format the summary as human-readable text.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "{} {} (run {})",
            self.workflow_type, self.workflow_id, self.run_id
        ));
        lines.push(format!("  status:  {}", self.status));
        if !self.start_time.is_empty() {
            lines.push(format!("  started: {}", self.start_time));
        }
        if let Some(close) = &self.close_time {
            lines.push(format!("  closed:  {}", close));
        }
        if !self.input.is_null() {
            lines.push(format!("  input:   {}", self.input));
        }
        if !self.result.is_null() {
            lines.push(format!("  result:  {}", self.result));
        }
        let mut failure = self.failure.as_ref();
        let mut label = "failure";
        while let Some(f) = failure {
            lines.push(format!("  {}: [{}] {}", label, f.failure_type, f.message));
            failure = f.cause.as_deref();
            label = "caused by";
        }

        if !self.timeline.is_empty() {
            lines.push(String::new());
            lines.push("Timeline:".to_string());
            for step in &self.timeline {
                let mut line = format!("  {:>3}. {} [{}]", step.step, step.activity, step.status);
                if let Some(ms) = step.duration_ms {
                    line.push_str(&format!(" {}ms", ms));
                }
                if let Some(retries) = step.retries {
                    line.push_str(&format!(" retries={}", retries));
                }
                lines.push(line);
                if let Some(msg) = &step.failure {
                    lines.push(format!("       failure: {}", msg));
                }
            }
        }

        if !self.signals_received.is_empty() {
            lines.push(String::new());
            lines.push("Signals:".to_string());
            for s in &self.signals_received {
                lines.push(format!("  {} at {}", s.name, s.time));
            }
        }

        if !self.timers_fired.is_empty() {
            lines.push(String::new());
            lines.push("Timers:".to_string());
            for t in &self.timers_fired {
                lines.push(format!("  {} ({}) fired at {}", t.timer_id, t.duration, t.fired_time));
            }
        }

        if !self.child_workflows.is_empty() {
            lines.push(String::new());
            lines.push("Child workflows:".to_string());
            for c in &self.child_workflows {
                lines.push(format!(
                    "  {} {} [{}]",
                    c.workflow_id,
                    c.workflow_type,
                    c.status.as_str()
                ));
            }
        }

        if let Some(warning) = &self.warning {
            lines.push(String::new());
            lines.push(format!("warning: {}", warning));
        }

        lines.join("\n")
    }
}
