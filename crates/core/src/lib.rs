//! xray-core: workflow history summarization and execution diffing.
//!
//! Takes an ordered history (as produced by xray-history), reconstructs a
//! timeline of activity executions with signals, timers and child
//! workflows, and diffs two such summaries to surface where two runs of
//! the same workflow diverged.
//!
//! Every operation here is pure and total: irregular or partial events
//! degrade to placeholder values rather than errors. Rejecting empty
//! histories is the caller's job.

pub mod compare;
pub mod diff;
pub mod grouping;
pub mod payload;
pub mod summarize;
pub mod summary;

pub use compare::{compare, ExecutionComparison, ExecutionSide};
pub use diff::{diff, Divergence, DivergenceReport, SignalDifferences, StructuralDifferences};
pub use grouping::ActivityExecutionGroup;
pub use payload::{decode, decode_many};
pub use summarize::{format_duration, summarize, value_summary};
pub use summary::{
    ActivityStatus, ChildWorkflowRecord, ChildWorkflowStatus, DetailLevel, ExecutionSummary,
    FailureInfo, SignalRecord, TimelineStep, TimerRecord, WorkflowStatus,
};
