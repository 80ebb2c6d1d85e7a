mod commands;
mod fetch;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xray_core::DetailLevel;
use xray_source::{ExecutionStatus, FileSource, DEFAULT_LIST_LIMIT};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Workflow execution X-ray: summarize and diff workflow histories.
#[derive(Parser)]
#[command(
    name = "xray",
    version,
    about = "Summarize and diff workflow execution histories"
)]
struct Cli {
    /// Directory of exported histories, laid out as <namespace>/<workflow-id>.json
    #[arg(long, global = true, env = "XRAY_HISTORY_DIR", default_value = "./histories")]
    history_dir: PathBuf,

    /// Namespace to read executions from
    #[arg(long, global = true, env = "TEMPORAL_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize one execution's history
    History {
        /// Workflow ID to summarize
        workflow_id: String,
        /// Run ID (defaults to the latest run)
        #[arg(long)]
        run_id: Option<String>,
        /// Detail level (summary, standard or full)
        #[arg(long, default_value = "summary")]
        detail: DetailLevel,
        /// Comma-separated event types to keep before grouping activities
        #[arg(long, value_delimiter = ',')]
        event_types: Vec<String>,
    },

    /// Compare two executions and report where they diverged
    Compare {
        /// First workflow ID
        workflow_id_a: String,
        /// Second workflow ID
        workflow_id_b: String,
        /// Run ID of the first execution (defaults to the latest run)
        #[arg(long)]
        run_id_a: Option<String>,
        /// Run ID of the second execution (defaults to the latest run)
        #[arg(long)]
        run_id_b: Option<String>,
    },

    /// List recent executions in the namespace
    List {
        /// Only executions of this workflow type
        #[arg(long)]
        workflow_type: Option<String>,
        /// Only executions in this status (running, completed, failed, timed_out, canceled, terminated)
        #[arg(long)]
        status: Option<ExecutionStatus>,
        /// Maximum number of executions to return (1-50)
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },

    /// Print the history event type table
    Events,
}

/// Effective settings for one invocation.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub history_dir: PathBuf,
    pub namespace: String,
    pub output: OutputFormat,
    pub quiet: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            history_dir: self.history_dir.clone(),
            namespace: self.namespace.clone(),
            output: self.output,
            quiet: self.quiet,
        }
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    if let Commands::Events = cli.command {
        commands::events::cmd_events(&config);
        return;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("failed to start runtime: {}", e),
                config.output,
                config.quiet,
            );
            process::exit(1);
        }
    };
    let source = FileSource::new(&config.history_dir);

    let result = rt.block_on(async {
        match cli.command {
            Commands::History {
                workflow_id,
                run_id,
                detail,
                event_types,
            } => {
                commands::history::cmd_history(
                    &source,
                    &config,
                    &workflow_id,
                    run_id,
                    detail,
                    &event_types,
                )
                .await
            }
            Commands::Compare {
                workflow_id_a,
                workflow_id_b,
                run_id_a,
                run_id_b,
            } => {
                commands::compare::cmd_compare(
                    &source,
                    &config,
                    (workflow_id_a.as_str(), run_id_a),
                    (workflow_id_b.as_str(), run_id_b),
                )
                .await
            }
            Commands::List {
                workflow_type,
                status,
                limit,
            } => commands::list::cmd_list(&source, &config, workflow_type, status, limit).await,
            Commands::Events => Ok(()),
        }
    });

    if let Err(e) = result {
        report_error(&e.to_string(), config.output, config.quiet);
        process::exit(1);
    }
}

/// Print a serializable value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) {
    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
