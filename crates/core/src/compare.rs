//! Side-by-side comparison of two executions.

use crate::diff::{diff, DivergenceReport};
use crate::summary::{ExecutionSummary, WorkflowStatus};
use serde::Serialize;

/// Identity of one side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionSide {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub workflow_type: String,
}

impl From<&ExecutionSummary> for ExecutionSide {
    fn from(summary: &ExecutionSummary) -> Self {
        ExecutionSide {
            workflow_id: summary.workflow_id.clone(),
            status: summary.status,
            workflow_type: summary.workflow_type.clone(),
        }
    }
}

/// The divergence report for two executions plus their identities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionComparison {
    pub execution_a: ExecutionSide,
    pub execution_b: ExecutionSide,
    pub same_workflow_type: bool,
    #[serde(flatten)]
    pub report: DivergenceReport,
}

impl ExecutionComparison {
    /// Format the comparison as human-readable text.
    pub fn to_text(&self) -> String {
        let mut lines = vec![
            format!(
                "A: {} {} [{}]",
                self.execution_a.workflow_type, self.execution_a.workflow_id, self.execution_a.status
            ),
            format!(
                "B: {} {} [{}]",
                self.execution_b.workflow_type, self.execution_b.workflow_id, self.execution_b.status
            ),
        ];
        if !self.same_workflow_type {
            lines.push("warning: executions have different workflow types".to_string());
        }
        lines.push(String::new());
        lines.push(self.report.to_text());
        lines.join("\n")
    }
}

/// Compare two summaries, typically fetched at standard detail.
pub fn compare(a: &ExecutionSummary, b: &ExecutionSummary) -> ExecutionComparison {
    ExecutionComparison {
        execution_a: ExecutionSide::from(a),
        execution_b: ExecutionSide::from(b),
        same_workflow_type: a.workflow_type == b.workflow_type,
        report: diff(a, b),
    }
}
