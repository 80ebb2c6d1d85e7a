use async_trait::async_trait;
use xray_history::HistoryEvent;

use crate::error::SourceError;
use crate::record::{ExecutionDescription, ExecutionPage, ExecutionRef, ListFilter};

/// Read-only access to workflow execution histories.
///
/// A `HistorySource` is the only component that performs I/O; everything
/// downstream (summarization, diffing) works on the materialized event
/// list it returns.
///
/// ## Run selection
///
/// An [`ExecutionRef`] without a run id addresses the latest run of the
/// workflow. With a run id, exactly that run is addressed and any other
/// run must be reported as [`SourceError::NotFound`].
///
/// ## Empty histories
///
/// `fetch_history` may return an empty list for an execution the backend
/// knows about but holds no events for. Callers are expected to treat an
/// empty history as not found before summarizing it.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` so one source can serve
/// concurrent fetches (for example both sides of a comparison).
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch the ordered event history of one execution.
    async fn fetch_history(&self, execution: &ExecutionRef)
        -> Result<Vec<HistoryEvent>, SourceError>;

    /// Describe one execution (run id, type, status, timing).
    async fn describe(&self, execution: &ExecutionRef)
        -> Result<ExecutionDescription, SourceError>;

    /// List the latest run of each execution in a namespace, newest first.
    async fn list_executions(&self, filter: &ListFilter) -> Result<ExecutionPage, SourceError>;
}
