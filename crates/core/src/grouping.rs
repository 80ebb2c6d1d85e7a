//! Event filtering and activity lifecycle grouping.

use std::collections::HashMap;
use tracing::debug;
use xray_history::{EventAttributes, EventType, HistoryEvent};

/// The lifecycle events observed for one activity id.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityExecutionGroup<'a> {
    pub activity_type: String,
    pub activity_id: String,
    pub scheduled: Option<&'a HistoryEvent>,
    pub started: Option<&'a HistoryEvent>,
    pub completed: Option<&'a HistoryEvent>,
    pub failed: Option<&'a HistoryEvent>,
    pub timed_out: Option<&'a HistoryEvent>,
    pub canceled: Option<&'a HistoryEvent>,
}

impl<'a> ActivityExecutionGroup<'a> {
    fn new(activity_type: String, activity_id: String) -> Self {
        ActivityExecutionGroup {
            activity_type,
            activity_id,
            scheduled: None,
            started: None,
            completed: None,
            failed: None,
            timed_out: None,
            canceled: None,
        }
    }

    /// The event that closed this activity, most terminal first.
    pub fn end_event(&self) -> Option<&'a HistoryEvent> {
        self.completed
            .or(self.failed)
            .or(self.timed_out)
            .or(self.canceled)
    }
}

/// Keep only events whose symbolic type is in `event_types` (case-insensitive).
pub fn filter_by_event_types<'a>(
    events: &'a [HistoryEvent],
    event_types: &[String],
) -> Vec<&'a HistoryEvent> {
    let wanted: Vec<String> = event_types.iter().map(|t| t.to_lowercase()).collect();
    events
        .iter()
        .filter(|e| wanted.contains(&e.name().to_lowercase()))
        .collect()
}

/// Drop engine bookkeeping events (the `WorkflowTask*` family).
pub fn filter_internal_events(events: &[HistoryEvent]) -> Vec<&HistoryEvent> {
    events
        .iter()
        .filter(|e| !e.event_type.is_internal())
        .collect()
}

/// Group activity lifecycle events by activity id.
///
/// Groups are returned in the order their activity was first scheduled.
/// Lifecycle events are attributed through their `scheduled_event_id`
/// back-reference; events that reference no known scheduled event are
/// dropped.
pub fn group_activity_events<'a, I>(events: I) -> Vec<ActivityExecutionGroup<'a>>
where
    I: IntoIterator<Item = &'a HistoryEvent>,
{
    let mut groups: Vec<ActivityExecutionGroup<'a>> = Vec::new();
    let mut by_activity_id: HashMap<String, usize> = HashMap::new();
    let mut by_scheduled_event: HashMap<i64, usize> = HashMap::new();

    for event in events {
        if let EventAttributes::ActivityTaskScheduled(attrs) = &event.attributes {
            let Some(activity_id) = attrs.activity_id.clone() else {
                continue;
            };
            let idx = *by_activity_id.entry(activity_id.clone()).or_insert_with(|| {
                let activity_type = attrs
                    .activity_type
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string());
                groups.push(ActivityExecutionGroup::new(activity_type, activity_id));
                groups.len() - 1
            });
            groups[idx].scheduled = Some(event);
            by_scheduled_event.insert(event.event_id, idx);
            continue;
        }

        let Some(scheduled_id) = event.attributes.scheduled_event_id() else {
            continue;
        };
        let Some(&idx) = by_scheduled_event.get(&scheduled_id) else {
            debug!(
                event_id = event.event_id,
                scheduled_event_id = scheduled_id,
                event_type = %event.event_type,
                "dropping lifecycle event with no matching scheduled event"
            );
            continue;
        };

        let group = &mut groups[idx];
        match event.event_type {
            EventType::ActivityTaskStarted => group.started = Some(event),
            EventType::ActivityTaskCompleted => group.completed = Some(event),
            EventType::ActivityTaskFailed => group.failed = Some(event),
            EventType::ActivityTaskTimedOut => group.timed_out = Some(event),
            EventType::ActivityTaskCanceled => group.canceled = Some(event),
            _ => {}
        }
    }

    groups
}
