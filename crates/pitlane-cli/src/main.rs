mod logging;
mod writer;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use pitlane_core::{Pipeline, RunOptions, RunResult, SqliteConnector, load_config};
use pitlane_reports::{JsonFormatter, Reporter, StdOutFormatter};
use tracing::{info, warn};

use crate::logging::{LogConfig, LogFormat, init_logging, log_file_path};
use crate::writer::{resolve_file_path, write_report};

/// Output format for the run report
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Print a summary table to standard output
    Stdout,
    /// Write the report as JSON (see --report)
    Json,
}

/// Format of log events on stderr
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "pitlane",
    version,
    about = "pitlane - Formula-1 CSV ingestion pipeline",
    long_about = "pitlane validates, cleans, and deduplicates Formula-1 CSV datasets, writes \
                  valid and rejected rows to CSV, and loads the valid rows into SQLite.\n\n\
                  Example usage:\n  \
                  pitlane --config config/ingestion.toml --dataset results -v"
)]
struct Args {
    /// Path to the TOML ingestion configuration
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Only run the named dataset (repeatable)
    #[arg(long = "dataset", value_name = "NAME")]
    datasets: Vec<String>,

    /// Skip store loads even for datasets with `load = true`
    #[arg(long)]
    no_load: bool,

    /// SQLite database file; overrides `store.path`
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Output format for the run report
    #[arg(short, long, value_enum, default_value = "stdout")]
    output: OutputFormat,

    /// Where to write the JSON report (file or directory)
    #[arg(long, value_name = "PATH")]
    report: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Format of log events on stderr
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatArg,

    /// Print full error chains on failure
    #[arg(short, long)]
    debug: bool,
}

fn report(args: &Args, run: &RunResult, timestamp: &str) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION").to_string();
    match args.output {
        OutputFormat::Stdout => {
            let mut formatter = StdOutFormatter::new(version);
            formatter.on_start(run.datasets.len());
            for result in &run.datasets {
                formatter.on_dataset_result(result);
            }
            formatter.on_summary(run.passed_count(), run.failed_count());
        }
        OutputFormat::Json => {
            let mut formatter = JsonFormatter::new(version);
            for result in &run.datasets {
                formatter.on_dataset_result(result);
            }
            let json = formatter.to_json().context("Failed to serialise report")?;
            let path = resolve_file_path(&args.report, timestamp)?;
            write_report(&path, &json)?;
            println!("Report written to {}", path.display());
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<bool> {
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config.display()))?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let log_config = LogConfig::resolve(args.verbose, config.logging.level.as_deref())?
        .with_format(args.log_format.into())
        .with_log_file(Some(log_file_path(&config.logging.log_dir, &timestamp)));
    init_logging(&log_config)?;

    info!(
        config = %args.config.display(),
        datasets = config.datasets.len(),
        "Starting ingestion run"
    );

    let database = args.database.clone().or_else(|| config.store.path.clone());
    let connector = match (&database, args.no_load) {
        (Some(path), false) => Some(SqliteConnector::new(
            path,
            Duration::from_millis(config.store.busy_timeout_ms),
        )),
        (None, false) if config.any_load_enabled() => {
            warn!("Datasets request a store load but no database is configured");
            None
        }
        _ => None,
    };

    let mut pipeline = Pipeline::new(&config);
    if let Some(connector) = &connector {
        pipeline = pipeline.with_connector(connector);
    }

    let options = RunOptions::only(args.datasets.clone());
    let run = pipeline
        .run_with(&options)
        .context("Failed to select datasets")?;

    report(args, &run, &timestamp)?;
    Ok(run.is_passed())
}

fn main() {
    let args = Args::parse();

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            if args.debug {
                eprintln!("Error: {:?}", err);
            } else {
                eprintln!("Error: {:#}", err);
                eprintln!("\nHint: Run with --debug flag for the full error chain");
            }
            std::process::exit(1);
        }
    }
}
