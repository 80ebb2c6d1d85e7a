use xray_core::DetailLevel;
use xray_source::{ExecutionRef, HistorySource, SourceError};

use crate::fetch::{fetch_summary, SummaryRequest};
use crate::{print_json, Config, OutputFormat};

pub(crate) async fn cmd_history(
    source: &dyn HistorySource,
    config: &Config,
    workflow_id: &str,
    run_id: Option<String>,
    detail: DetailLevel,
    event_types: &[String],
) -> Result<(), SourceError> {
    let request = SummaryRequest {
        execution: ExecutionRef::latest(&config.namespace, workflow_id).with_run_id(run_id),
        detail,
        event_types,
    };
    let summary = fetch_summary(source, &request).await?;

    match config.output {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            println!("{}", summary.to_text());
        }
    }
    Ok(())
}
