use xray_source::{ExecutionStatus, HistorySource, ListFilter, SourceError};

use crate::{print_json, Config, OutputFormat};

pub(crate) async fn cmd_list(
    source: &dyn HistorySource,
    config: &Config,
    workflow_type: Option<String>,
    status: Option<ExecutionStatus>,
    limit: usize,
) -> Result<(), SourceError> {
    let filter = ListFilter {
        workflow_type,
        status,
        limit,
        ..ListFilter::new(&config.namespace)
    };
    let page = source.list_executions(&filter).await?;

    match config.output {
        OutputFormat::Json => print_json(&page),
        OutputFormat::Text => {
            if page.workflows.is_empty() {
                if !config.quiet {
                    println!("No executions found in namespace '{}'.", config.namespace);
                }
                return Ok(());
            }
            for d in &page.workflows {
                println!(
                    "{:<24} {:<24} {:<10} {}",
                    d.workflow_id,
                    d.workflow_type,
                    d.status.as_str(),
                    d.start_time
                );
            }
            if page.has_more && !config.quiet {
                println!(
                    "(showing {}; more available, raise --limit to see them)",
                    page.total_count
                );
            }
        }
    }
    Ok(())
}
