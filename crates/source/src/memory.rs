use async_trait::async_trait;
use std::collections::BTreeMap;
use xray_history::HistoryEvent;

use crate::error::SourceError;
use crate::record::{ExecutionDescription, ExecutionPage, ExecutionRef, ListFilter};
use crate::traits::HistorySource;

#[derive(Debug, Clone)]
struct StoredRun {
    run_id: String,
    events: Vec<HistoryEvent>,
}

/// An in-memory history source.
///
/// Runs are kept per `(namespace, workflow_id)` in insertion order; the
/// most recently inserted run is the latest.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    runs: BTreeMap<(String, String), Vec<StoredRun>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a run. Its run id is read from the history's start event.
    pub fn insert(&mut self, namespace: &str, workflow_id: &str, events: Vec<HistoryEvent>) {
        let run_id = ExecutionDescription::from_history(workflow_id, &events).run_id;
        self.runs
            .entry((namespace.to_string(), workflow_id.to_string()))
            .or_default()
            .push(StoredRun { run_id, events });
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_history(mut self, namespace: &str, workflow_id: &str, events: Vec<HistoryEvent>) -> Self {
        self.insert(namespace, workflow_id, events);
        self
    }

    fn find(&self, execution: &ExecutionRef) -> Result<&StoredRun, SourceError> {
        let not_found = || SourceError::NotFound {
            workflow_id: execution.workflow_id.clone(),
        };
        let runs = self
            .runs
            .get(&(execution.namespace.clone(), execution.workflow_id.clone()))
            .ok_or_else(not_found)?;
        let run = match &execution.run_id {
            Some(run_id) => runs.iter().rev().find(|r| &r.run_id == run_id),
            None => runs.last(),
        };
        run.ok_or_else(not_found)
    }
}

#[async_trait]
impl HistorySource for MemorySource {
    async fn fetch_history(
        &self,
        execution: &ExecutionRef,
    ) -> Result<Vec<HistoryEvent>, SourceError> {
        Ok(self.find(execution)?.events.clone())
    }

    async fn describe(
        &self,
        execution: &ExecutionRef,
    ) -> Result<ExecutionDescription, SourceError> {
        let run = self.find(execution)?;
        Ok(ExecutionDescription::from_history(
            &execution.workflow_id,
            &run.events,
        ))
    }

    async fn list_executions(&self, filter: &ListFilter) -> Result<ExecutionPage, SourceError> {
        if !self.runs.keys().any(|(ns, _)| ns == &filter.namespace) {
            return Err(SourceError::NamespaceNotFound {
                namespace: filter.namespace.clone(),
            });
        }

        let matches = self
            .runs
            .iter()
            .filter(|((ns, _), _)| ns == &filter.namespace)
            .filter_map(|((_, workflow_id), runs)| {
                runs.last()
                    .map(|run| ExecutionDescription::from_history(workflow_id, &run.events))
            })
            .filter(|d| filter.matches(d))
            .collect();

        Ok(ExecutionPage::paginate(matches, filter))
    }
}
