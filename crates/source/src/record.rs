use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use xray_history::{EventAttributes, EventType, HistoryEvent};

/// Default page size for execution listings.
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Largest accepted page size for execution listings.
pub const MAX_LIST_LIMIT: usize = 50;

/// Identifies one workflow execution. `run_id: None` means the latest run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionRef {
    pub namespace: String,
    pub workflow_id: String,
    pub run_id: Option<String>,
}

impl ExecutionRef {
    pub fn latest(namespace: &str, workflow_id: &str) -> Self {
        ExecutionRef {
            namespace: namespace.to_string(),
            workflow_id: workflow_id.to_string(),
            run_id: None,
        }
    }

    pub fn with_run_id(mut self, run_id: Option<String>) -> Self {
        self.run_id = run_id;
        self
    }
}

impl fmt::Display for ExecutionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.run_id {
            Some(run) => write!(f, "{}/{}@{}", self.namespace, self.workflow_id, run),
            None => write!(f, "{}/{}", self.namespace, self.workflow_id),
        }
    }
}

/// Coarse execution status as reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    TimedOut,
    Canceled,
    Terminated,
}

impl ExecutionStatus {
    /// Status implied by the first terminal event in a history.
    pub fn from_history(events: &[HistoryEvent]) -> ExecutionStatus {
        let terminal = events.iter().find(|e| e.event_type.is_workflow_terminal());
        match terminal.map(|e| e.event_type) {
            Some(EventType::WorkflowExecutionCompleted) => ExecutionStatus::Completed,
            Some(EventType::WorkflowExecutionFailed) => ExecutionStatus::Failed,
            Some(EventType::WorkflowExecutionTimedOut) => ExecutionStatus::TimedOut,
            Some(EventType::WorkflowExecutionCanceled) => ExecutionStatus::Canceled,
            Some(EventType::WorkflowExecutionTerminated) => ExecutionStatus::Terminated,
            _ => ExecutionStatus::Running,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::TimedOut => "TIMED_OUT",
            ExecutionStatus::Canceled => "CANCELED",
            ExecutionStatus::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    /// Accepts `running`, `completed`, `failed`, `timed_out`, `canceled`
    /// (or `cancelled`) and `terminated`, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            "timed_out" | "timedout" => Ok(ExecutionStatus::TimedOut),
            "canceled" | "cancelled" => Ok(ExecutionStatus::Canceled),
            "terminated" => Ok(ExecutionStatus::Terminated),
            other => Err(format!("unknown execution status '{}'", other)),
        }
    }
}

/// Terminal description of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDescription {
    pub workflow_id: String,
    pub run_id: String,
    pub workflow_type: String,
    pub status: ExecutionStatus,
    /// RFC 3339 timestamp string, empty when the history has no start event.
    pub start_time: String,
    /// RFC 3339 timestamp string. None while running.
    pub close_time: Option<String>,
    pub duration_ms: Option<i64>,
    pub task_queue: String,
}

impl ExecutionDescription {
    /// Derive a description from an execution's own history.
    pub fn from_history(workflow_id: &str, events: &[HistoryEvent]) -> ExecutionDescription {
        let start = events
            .iter()
            .find(|e| e.event_type == EventType::WorkflowExecutionStarted);
        let terminal = events.iter().find(|e| e.event_type.is_workflow_terminal());

        let (run_id, workflow_type, task_queue) = match start.map(|e| &e.attributes) {
            Some(EventAttributes::WorkflowExecutionStarted(attrs)) => (
                attrs.original_execution_run_id.clone(),
                attrs.workflow_type.clone(),
                attrs.task_queue.clone(),
            ),
            _ => (None, None, None),
        };

        let duration_ms = match (
            start.and_then(|e| e.event_time),
            terminal.and_then(|e| e.event_time),
        ) {
            (Some(open), Some(close)) => Some(close.epoch_millis() - open.epoch_millis()),
            _ => None,
        };

        ExecutionDescription {
            workflow_id: workflow_id.to_string(),
            run_id: run_id.unwrap_or_else(|| "unknown".to_string()),
            workflow_type: workflow_type.unwrap_or_else(|| "Unknown".to_string()),
            status: ExecutionStatus::from_history(events),
            start_time: start.and_then(HistoryEvent::time_rfc3339).unwrap_or_default(),
            close_time: terminal.and_then(HistoryEvent::time_rfc3339),
            duration_ms,
            task_queue: task_queue.unwrap_or_default(),
        }
    }
}

/// Filter for execution listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    pub namespace: String,
    pub workflow_type: Option<String>,
    /// `None` lists executions in every status.
    pub status: Option<ExecutionStatus>,
    pub limit: usize,
}

impl ListFilter {
    pub fn new(namespace: &str) -> Self {
        ListFilter {
            namespace: namespace.to_string(),
            workflow_type: None,
            status: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }

    /// The page size clamped to `1..=50`.
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIST_LIMIT)
    }

    pub fn matches(&self, description: &ExecutionDescription) -> bool {
        let type_ok = self
            .workflow_type
            .as_deref()
            .map_or(true, |t| t == description.workflow_type);
        let status_ok = self.status.map_or(true, |s| s == description.status);
        type_ok && status_ok
    }
}

/// One page of an execution listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPage {
    pub workflows: Vec<ExecutionDescription>,
    pub total_count: usize,
    pub has_more: bool,
}

impl ExecutionPage {
    /// Order matches newest first and cut them to the filter's page size.
    pub fn paginate(mut matches: Vec<ExecutionDescription>, filter: &ListFilter) -> ExecutionPage {
        matches.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| a.workflow_id.cmp(&b.workflow_id))
        });
        let limit = filter.effective_limit();
        let has_more = matches.len() > limit;
        matches.truncate(limit);
        ExecutionPage {
            total_count: matches.len(),
            workflows: matches,
            has_more,
        }
    }
}
