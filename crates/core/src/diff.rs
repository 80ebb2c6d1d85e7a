//! Divergence detection between two execution summaries.

use crate::summary::{ExecutionSummary, TimelineStep};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// A single data difference between two aligned timeline steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Divergence {
    /// Step number in execution A.
    pub step: usize,
    pub activity: String,
    /// Dotted/bracketed path (`input.items[0].sku`), `status` or `retries`.
    pub field: String,
    pub value_a: Value,
    pub value_b: Value,
    pub note: String,
}

/// Differences in which activities ran and in what order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuralDifferences {
    pub activities_only_in_a: Vec<String>,
    pub activities_only_in_b: Vec<String>,
    pub different_execution_order: bool,
}

/// Signal names received by only one of the executions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignalDifferences {
    pub signals_only_in_a: Vec<String>,
    pub signals_only_in_b: Vec<String>,
}

/// The result of diffing two execution summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergenceReport {
    pub divergences: Vec<Divergence>,
    pub structural_differences: StructuralDifferences,
    pub signals: SignalDifferences,
}

impl DivergenceReport {
    /// Returns true if the executions did not diverge in any way.
    pub fn is_empty(&self) -> bool {
        let s = &self.structural_differences;
        self.divergences.is_empty()
            && s.activities_only_in_a.is_empty()
            && s.activities_only_in_b.is_empty()
            && !s.different_execution_order
            && self.signals.signals_only_in_a.is_empty()
            && self.signals.signals_only_in_b.is_empty()
    }

    /// Format the report as human-readable text.
    pub fn to_text(&self) -> String {
        if self.is_empty() {
            return "No divergences found.".to_string();
        }

        let mut lines = Vec::new();

        for d in &self.divergences {
            let a = serde_json::to_string(&d.value_a).unwrap_or_default();
            let b = serde_json::to_string(&d.value_b).unwrap_or_default();
            lines.push(format!("~ step {} {} {}: {} -> {}", d.step, d.activity, d.field, a, b));
        }

        let s = &self.structural_differences;
        for activity in &s.activities_only_in_a {
            lines.push(format!("- activity {} (only in A)", activity));
        }
        for activity in &s.activities_only_in_b {
            lines.push(format!("+ activity {} (only in B)", activity));
        }
        if s.different_execution_order {
            lines.push("! activities executed in a different order".to_string());
        }

        for signal in &self.signals.signals_only_in_a {
            lines.push(format!("- signal {} (only in A)", signal));
        }
        for signal in &self.signals.signals_only_in_b {
            lines.push(format!("+ signal {} (only in B)", signal));
        }

        lines.join("\n")
    }
}

/// Diff two execution summaries.
pub fn diff(a: &ExecutionSummary, b: &ExecutionSummary) -> DivergenceReport {
    let report = DivergenceReport {
        divergences: data_divergences(&a.timeline, &b.timeline),
        structural_differences: structural_differences(&a.timeline, &b.timeline),
        signals: signal_differences(a, b),
    };
    debug!(
        a = %a.workflow_id,
        b = %b.workflow_id,
        divergences = report.divergences.len(),
        "diffed executions"
    );
    report
}

/// Pair each step of `a` with the first unused step of `b` of the same
/// activity type. Unpaired steps are left out.
pub fn align_timelines<'t>(
    a: &'t [TimelineStep],
    b: &'t [TimelineStep],
) -> Vec<(&'t TimelineStep, &'t TimelineStep)> {
    let mut used = vec![false; b.len()];
    let mut pairs = Vec::new();

    for step_a in a {
        let found = b
            .iter()
            .enumerate()
            .find(|(i, step_b)| !used[*i] && step_b.activity == step_a.activity);
        if let Some((i, step_b)) = found {
            used[i] = true;
            pairs.push((step_a, step_b));
        }
    }

    pairs
}

fn data_divergences(a: &[TimelineStep], b: &[TimelineStep]) -> Vec<Divergence> {
    let mut divergences = Vec::new();

    for (step_a, step_b) in align_timelines(a, b) {
        let mut diffs = Vec::new();
        deep_diff(&step_a.input_value(), &step_b.input_value(), "input", &mut diffs);
        deep_diff(&step_a.output_value(), &step_b.output_value(), "output", &mut diffs);

        for d in diffs {
            divergences.push(Divergence {
                step: step_a.step,
                activity: step_a.activity.clone(),
                note: format!("Different values at {}", d.path),
                field: d.path,
                value_a: d.value_a,
                value_b: d.value_b,
            });
        }

        if step_a.status != step_b.status {
            divergences.push(Divergence {
                step: step_a.step,
                activity: step_a.activity.clone(),
                field: "status".to_string(),
                value_a: Value::String(step_a.status.as_str().to_string()),
                value_b: Value::String(step_b.status.as_str().to_string()),
                note: format!(
                    "Activity {} has different status in each execution",
                    step_a.activity
                ),
            });
        }

        let retries_a = step_a.retries.unwrap_or(0);
        let retries_b = step_b.retries.unwrap_or(0);
        if retries_a != retries_b {
            divergences.push(Divergence {
                step: step_a.step,
                activity: step_a.activity.clone(),
                field: "retries".to_string(),
                value_a: Value::from(retries_a),
                value_b: Value::from(retries_b),
                note: format!("Different retry counts for {}", step_a.activity),
            });
        }
    }

    divergences
}

/// A leaf-level difference found by [`deep_diff`].
#[derive(Debug, Clone, PartialEq)]
pub struct PathDiff {
    pub path: String,
    pub value_a: Value,
    pub value_b: Value,
}

/// Structural deep diff of two JSON values.
///
/// Objects recurse over the union of their keys (sorted), arrays recurse
/// index-wise with missing elements treated as `null`, and every other
/// mismatch is reported as one leaf at `path`.
pub fn deep_diff(a: &Value, b: &Value, path: &str, out: &mut Vec<PathDiff>) {
    if a == b {
        return;
    }

    match (a, b) {
        (Value::Object(map_a), Value::Object(map_b)) => {
            let keys: BTreeSet<&String> = map_a.keys().chain(map_b.keys()).collect();
            for key in keys {
                deep_diff(
                    map_a.get(key).unwrap_or(&Value::Null),
                    map_b.get(key).unwrap_or(&Value::Null),
                    &format!("{}.{}", path, key),
                    out,
                );
            }
        }
        (Value::Array(arr_a), Value::Array(arr_b)) => {
            for i in 0..arr_a.len().max(arr_b.len()) {
                deep_diff(
                    arr_a.get(i).unwrap_or(&Value::Null),
                    arr_b.get(i).unwrap_or(&Value::Null),
                    &format!("{}[{}]", path, i),
                    out,
                );
            }
        }
        _ => out.push(PathDiff {
            path: path.to_string(),
            value_a: a.clone(),
            value_b: b.clone(),
        }),
    }
}

fn structural_differences(a: &[TimelineStep], b: &[TimelineStep]) -> StructuralDifferences {
    let types_a: Vec<&str> = a.iter().map(|s| s.activity.as_str()).collect();
    let types_b: Vec<&str> = b.iter().map(|s| s.activity.as_str()).collect();
    let set_a: HashSet<&str> = types_a.iter().copied().collect();
    let set_b: HashSet<&str> = types_b.iter().copied().collect();

    let common_a: Vec<&str> = types_a.iter().copied().filter(|t| set_b.contains(t)).collect();
    let common_b: Vec<&str> = types_b.iter().copied().filter(|t| set_a.contains(t)).collect();

    StructuralDifferences {
        activities_only_in_a: distinct_missing(&types_a, &set_b),
        activities_only_in_b: distinct_missing(&types_b, &set_a),
        different_execution_order: !common_a.is_empty()
            && !common_b.is_empty()
            && common_a != common_b,
    }
}

fn signal_differences(a: &ExecutionSummary, b: &ExecutionSummary) -> SignalDifferences {
    let names_a: Vec<&str> = a.signals_received.iter().map(|s| s.name.as_str()).collect();
    let names_b: Vec<&str> = b.signals_received.iter().map(|s| s.name.as_str()).collect();
    let set_a: HashSet<&str> = names_a.iter().copied().collect();
    let set_b: HashSet<&str> = names_b.iter().copied().collect();

    SignalDifferences {
        signals_only_in_a: distinct_missing(&names_a, &set_b),
        signals_only_in_b: distinct_missing(&names_b, &set_a),
    }
}

/// Names in `names` absent from `other`, deduplicated in first-seen order.
fn distinct_missing(names: &[&str], other: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|n| !other.contains(*n) && seen.insert(**n))
        .map(|n| n.to_string())
        .collect()
}
