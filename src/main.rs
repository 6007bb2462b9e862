//! Binary entry point for the strata CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Analyze unit documents and write the metrics document
//! strata analyze units/ --out metrics.json
//!
//! # List available metrics
//! strata metrics
//!
//! # Query a written document
//! strata show metrics.json --metric CBO --entity class:billing.Invoice
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use strata::cli::{list_metrics, run_analyze, run_show};
use strata::config::CliOverrides;
use strata::output::emit_response;
use strata::{ErrorResponse, StrataError};

// ============================================================================
// CLI Structure
// ============================================================================

/// Object-oriented metrics over resolved compilation units.
///
/// All output is JSON.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Object-oriented metrics over resolved compilation units")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Workspace root directory (default: current directory).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Build the model from unit documents and capture every metric.
    Analyze {
        /// Unit documents or directories of them.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Write the metrics document here instead of embedding it in the response.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Project name reported for the project entity.
        #[arg(long)]
        project_name: Option<String>,
        /// Run the reference phase on a thread pool.
        #[arg(long)]
        parallel: bool,
        /// Worker threads for the parallel reference phase.
        #[arg(long)]
        threads: Option<usize>,
        /// Record synthetic formal/actual in/out variables.
        #[arg(long)]
        dependence_vars: bool,
        /// Fail coupling metrics on incompletely resolved entities.
        #[arg(long)]
        strict: bool,
    },
    /// List registered metrics with their kinds and facets.
    Metrics,
    /// Query a metrics document.
    Show {
        /// Metrics document written by `analyze --out`.
        document: PathBuf,
        /// Metric id (e.g. CBO).
        #[arg(long)]
        metric: String,
        /// Entity key (project, package:NAME, class:QNAME, method:QNAME#SIG, field:QNAME#NAME).
        #[arg(long)]
        entity: Option<String>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.global.log_level);

    // Execute command and handle errors
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = err.error_code();
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), StrataError> {
    let workspace = match cli.global.workspace {
        Some(path) => path,
        None => std::env::current_dir()
            .map_err(|e| StrataError::internal(format!("cannot determine current directory: {}", e)))?,
    };

    match cli.command {
        Command::Analyze {
            inputs,
            out,
            project_name,
            parallel,
            threads,
            dependence_vars,
            strict,
        } => {
            let overrides = CliOverrides {
                project_name,
                parallel: parallel.then_some(true),
                threads,
                dependence_variables: dependence_vars.then_some(true),
                strict_metrics: strict.then_some(true),
            };
            let response = run_analyze(&workspace, &inputs, out.as_deref(), &overrides)?;
            emit(&response)
        }
        Command::Metrics => emit(&list_metrics()),
        Command::Show {
            document,
            metric,
            entity,
        } => emit(&run_show(&workspace, &document, &metric, entity.as_deref())?),
    }
}

/// Write a success response to stdout.
fn emit<T: Serialize>(response: &T) -> Result<(), StrataError> {
    emit_response(response, &mut io::stdout()).map_err(|e| StrataError::internal(e.to_string()))?;
    let _ = io::stdout().flush();
    Ok(())
}
