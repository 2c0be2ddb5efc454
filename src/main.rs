//! CLI entry point for the surveillance coverage engine.
//!
//! Provides subcommands for computing week coverage, period summaries, and
//! the combined metrics payload from a CSV export of weekly case counts.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::Path;
use surveil_coverage::EngineConfig;
use surveil_coverage::engine::coverage::CoverageReport;
use surveil_coverage::engine::ingest::IngestStats;
use surveil_coverage::engine::types::{StateFilter, StateTotal, WeeklyTotal};
use surveil_coverage::output::{print_json, print_pretty, write_json};
use surveil_coverage::service::SurveillanceService;
use surveil_coverage::source::CsvRowSource;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "surveil_coverage")]
#[command(about = "Weekly surveillance coverage and signal detection", long_about = None)]
struct Cli {
    /// JSON config file with thresholds (falls back to SURVEIL_CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct QueryArgs {
    /// CSV export of weekly rows
    #[arg(short, long, value_name = "CSV")]
    data: String,

    /// First day of the range (YYYY-MM-DD, inclusive)
    #[arg(long)]
    start: String,

    /// Last day of the range (YYYY-MM-DD, inclusive)
    #[arg(long)]
    end: String,

    /// Restrict to a state; repeat for several. Omit or pass "All States" for no filter
    #[arg(long = "state")]
    states: Vec<String>,

    /// Optional: also write the JSON result to this file
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Available and missing weeks plus weekly and per-state totals
    Coverage(QueryArgs),
    /// Totals, averages and deltas against the preceding window
    Summary(QueryArgs),
    /// Full metrics payload for the narrative generator
    Metrics(QueryArgs),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CoverageView<'a> {
    coverage: &'a CoverageReport,
    weekly_totals: &'a [WeeklyTotal],
    state_totals: &'a [StateTotal],
    ingest: &'a IngestStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/surveil_coverage.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("surveil_coverage.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .or_else(|| std::env::var("SURVEIL_CONFIG_PATH").ok());
    let config = EngineConfig::load_or_default(config_path.as_deref())?;
    info!(config = ?config_path, "Engine config loaded");

    match cli.command {
        Commands::Coverage(args) => {
            let (service, filter) = build(&args, config);
            let outcome = service
                .coverage(&args.start, &args.end, &filter)
                .await
                .context("coverage failed")?;
            print_pretty(&outcome.ingest);

            let view = CoverageView {
                coverage: &outcome.report,
                weekly_totals: &outcome.weekly_totals,
                state_totals: &outcome.state_totals,
                ingest: &outcome.ingest,
            };
            emit(&view, args.output.as_deref())?;
        }
        Commands::Summary(args) => {
            let (service, filter) = build(&args, config);
            let summary = service
                .summary(&args.start, &args.end, &filter)
                .await
                .context("summary failed")?;
            emit(&summary, args.output.as_deref())?;
        }
        Commands::Metrics(args) => {
            let (service, filter) = build(&args, config);
            let payload = service
                .report_metrics(&args.start, &args.end, &filter)
                .await
                .context("metrics failed")?;
            emit(&payload, args.output.as_deref())?;
        }
    }

    Ok(())
}

fn build(args: &QueryArgs, config: EngineConfig) -> (SurveillanceService<CsvRowSource>, StateFilter) {
    let filter = StateFilter::from_names(args.states.iter().cloned());
    info!(
        data = %args.data,
        start = %args.start,
        end = %args.end,
        filter = %filter.label(),
        "Running query"
    );
    (
        SurveillanceService::new(CsvRowSource::new(&args.data), config),
        filter,
    )
}

fn emit(value: &impl Serialize, output: Option<&str>) -> Result<()> {
    print_json(value)?;
    if let Some(path) = output {
        write_json(path, value)?;
    }
    Ok(())
}
