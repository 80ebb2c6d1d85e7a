//! The closed table of history event type codes.
//!
//! Codes 1..=40 match the orchestration engine's numeric event type enum
//! and must not be renumbered. Codes outside the table resolve to
//! [`EventType::Unknown`] instead of failing.

use std::borrow::Cow;
use std::fmt;

macro_rules! event_types {
    ($($code:literal => $variant:ident,)+) => {
        /// Symbolic history event type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EventType {
            $($variant,)+
            /// A code not present in the table.
            Unknown(i32),
        }

        impl EventType {
            /// Every known event type, in code order.
            pub const ALL: &'static [EventType] = &[$(EventType::$variant,)+];

            /// Resolve a numeric event type code.
            pub fn from_code(code: i32) -> EventType {
                match code {
                    $($code => EventType::$variant,)+
                    other => EventType::Unknown(other),
                }
            }

            /// The numeric code for this event type.
            pub fn code(&self) -> i32 {
                match self {
                    $(EventType::$variant => $code,)+
                    EventType::Unknown(code) => *code,
                }
            }

            fn known_name(&self) -> Option<&'static str> {
                match self {
                    $(EventType::$variant => Some(stringify!($variant)),)+
                    EventType::Unknown(_) => None,
                }
            }
        }
    };
}

event_types! {
    1 => WorkflowExecutionStarted,
    2 => WorkflowExecutionCompleted,
    3 => WorkflowExecutionFailed,
    4 => WorkflowExecutionTimedOut,
    5 => WorkflowTaskScheduled,
    6 => WorkflowTaskStarted,
    7 => WorkflowTaskCompleted,
    8 => WorkflowTaskTimedOut,
    9 => WorkflowTaskFailed,
    10 => ActivityTaskScheduled,
    11 => ActivityTaskStarted,
    12 => ActivityTaskCompleted,
    13 => ActivityTaskFailed,
    14 => ActivityTaskTimedOut,
    15 => ActivityTaskCancelRequested,
    16 => ActivityTaskCanceled,
    17 => TimerStarted,
    18 => TimerFired,
    19 => TimerCanceled,
    20 => WorkflowExecutionCancelRequested,
    21 => WorkflowExecutionCanceled,
    22 => RequestCancelExternalWorkflowExecutionInitiated,
    23 => RequestCancelExternalWorkflowExecutionFailed,
    24 => ExternalWorkflowExecutionCancelRequested,
    25 => MarkerRecorded,
    26 => WorkflowExecutionSignaled,
    27 => WorkflowExecutionTerminated,
    28 => WorkflowExecutionContinuedAsNew,
    29 => StartChildWorkflowExecutionInitiated,
    30 => StartChildWorkflowExecutionFailed,
    31 => ChildWorkflowExecutionStarted,
    32 => ChildWorkflowExecutionCompleted,
    33 => ChildWorkflowExecutionFailed,
    34 => ChildWorkflowExecutionCanceled,
    35 => ChildWorkflowExecutionTimedOut,
    36 => ChildWorkflowExecutionTerminated,
    37 => SignalExternalWorkflowExecutionInitiated,
    38 => SignalExternalWorkflowExecutionFailed,
    39 => ExternalWorkflowExecutionSignaled,
    40 => UpsertWorkflowSearchAttributes,
}

impl EventType {
    /// Symbolic name, e.g. `ActivityTaskScheduled`.
    ///
    /// Unknown codes render as `UnknownEventType(<code>)`.
    pub fn name(&self) -> Cow<'static, str> {
        match self.known_name() {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("UnknownEventType({})", self.code())),
        }
    }

    /// Resolve a symbolic name.
    ///
    /// Accepts the PascalCase name in any letter case (`activitytaskscheduled`)
    /// and the engine's enum spelling (`EVENT_TYPE_ACTIVITY_TASK_SCHEDULED`).
    pub fn from_name(name: &str) -> Option<EventType> {
        let stripped = name.strip_prefix("EVENT_TYPE_").unwrap_or(name);
        let folded: String = stripped
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        EventType::ALL
            .iter()
            .find(|t| {
                t.known_name()
                    .is_some_and(|n| n.to_ascii_lowercase() == folded)
            })
            .copied()
    }

    /// Engine bookkeeping events that never carry user-meaningful data.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            EventType::WorkflowTaskScheduled
                | EventType::WorkflowTaskStarted
                | EventType::WorkflowTaskCompleted
                | EventType::WorkflowTaskFailed
                | EventType::WorkflowTaskTimedOut
        )
    }

    /// Events that close a workflow execution.
    pub fn is_workflow_terminal(&self) -> bool {
        matches!(
            self,
            EventType::WorkflowExecutionCompleted
                | EventType::WorkflowExecutionFailed
                | EventType::WorkflowExecutionTimedOut
                | EventType::WorkflowExecutionCanceled
                | EventType::WorkflowExecutionTerminated
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
