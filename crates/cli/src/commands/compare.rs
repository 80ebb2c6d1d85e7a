use xray_source::{ExecutionRef, HistorySource, SourceError};

use crate::fetch::compare_executions;
use crate::{print_json, Config, OutputFormat};

/// Divergences are a report, not a failure: this exits 0 whenever both
/// executions could be fetched.
pub(crate) async fn cmd_compare(
    source: &dyn HistorySource,
    config: &Config,
    (workflow_id_a, run_id_a): (&str, Option<String>),
    (workflow_id_b, run_id_b): (&str, Option<String>),
) -> Result<(), SourceError> {
    let a = ExecutionRef::latest(&config.namespace, workflow_id_a).with_run_id(run_id_a);
    let b = ExecutionRef::latest(&config.namespace, workflow_id_b).with_run_id(run_id_b);
    let comparison = compare_executions(source, a, b).await?;

    match config.output {
        OutputFormat::Json => print_json(&comparison),
        OutputFormat::Text => {
            println!("{}", comparison.to_text());
        }
    }
    Ok(())
}
