//! Article Ingest main entry point
//!
//! This is the command-line interface for the bulk article importer.

use anyhow::Context;
use article_ingest::config::{load_config_with_hash, Config};
use article_ingest::input::scan;
use article_ingest::output::{load_statistics, print_report, print_statistics};
use article_ingest::sink::StorageSink;
use article_ingest::storage::{open_storage, RunStatus, SqliteStorage, Storage};
use article_ingest::{IngestError, Pipeline, RunReport};
use clap::Parser;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Article Ingest: a bulk article importer
///
/// Reads a CSV of `title,url` rows, fetches every page with a fixed pool
/// of workers, extracts the article body and stores it in SQLite.
#[derive(Parser, Debug)]
#[command(name = "article-ingest")]
#[command(version)]
#[command(about = "A bulk article importer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// CSV input with `title` and `url` columns (reads stdin when omitted)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and scan the input without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, cli.input.as_deref())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_ingest(config, &config_hash, cli.input.as_deref()).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("article_ingest=info,warn"),
            1 => EnvFilter::new("article_ingest=debug,info"),
            2 => EnvFilter::new("article_ingest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Opens the CSV input, falling back to stdin
fn open_input(path: Option<&Path>) -> anyhow::Result<(Box<dyn Read>, String)> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input {}", path.display()))?;
            Ok((Box::new(file), path.display().to_string()))
        }
        None => Ok((Box::new(std::io::stdin()), "<stdin>".to_string())),
    }
}

/// Handles the --dry-run mode: validates config and counts what would be ingested
fn handle_dry_run(config: &Config, input: Option<&Path>) -> anyhow::Result<()> {
    println!("=== Article Ingest Dry Run ===\n");

    println!("Pipeline Configuration:");
    println!("  Queue capacity: {}", config.pipeline.queue_capacity);
    println!("  Workers: {}", config.pipeline.worker_count);
    println!("  Fetch timeout: {}ms", config.pipeline.fetch_timeout_ms);
    println!("  Connect timeout: {}ms", config.pipeline.connect_timeout_ms);
    println!(
        "  Skip empty content: {}",
        config.pipeline.skip_empty_content
    );

    println!("\nExtractor:");
    println!("  Container selector: {}", config.extractor.container_selector);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let (reader, input_name) = open_input(input)?;
    let summary = scan(reader)?;

    println!("\nInput ({}):", input_name);
    println!("  Rows: {}", summary.rows_read);
    println!("  Valid: {}", summary.valid_rows);
    println!("  Skipped: {}", summary.skipped_rows);

    println!("\n✓ Configuration is valid");
    println!("✓ Would enqueue {} jobs", summary.valid_rows);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main ingest operation
async fn handle_ingest(
    config: Config,
    config_hash: &str,
    input: Option<&Path>,
) -> anyhow::Result<()> {
    let (reader, input_name) = open_input(input)?;

    let storage = Arc::new(Mutex::new(open_storage(Path::new(
        &config.output.database_path,
    ))?));
    let run_id = lock_storage(&storage)?.create_run(config_hash, &input_name)?;
    tracing::info!("Starting run {} on {}", run_id, input_name);

    let sink = StorageSink::new(storage.clone(), run_id);
    let pipeline = Pipeline::from_config(&config, Arc::new(sink))?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing in-flight jobs");
                cancel.cancel();
            }
        });
    }

    let result = pipeline.run_until_cancelled(reader, cancel).await;
    record_outcome(&storage, run_id, &result)?;

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            if let Some(report) = e.partial_report() {
                print_report(report);
            }
            tracing::error!("Run {} failed: {}", run_id, e);
            Err(e.into())
        }
    }
}

/// Stores the final status and counters of a run
fn record_outcome(
    storage: &Mutex<SqliteStorage>,
    run_id: i64,
    result: &Result<RunReport, IngestError>,
) -> anyhow::Result<()> {
    let mut storage = lock_storage(storage)?;
    match result {
        Ok(report) => {
            let status = if report.cancelled {
                RunStatus::Cancelled
            } else {
                RunStatus::Completed
            };
            storage.finish_run(run_id, status, &report.totals())?;
        }
        Err(e) => {
            let totals = e
                .partial_report()
                .map(RunReport::totals)
                .unwrap_or_default();
            storage.finish_run(run_id, RunStatus::Aborted, &totals)?;
        }
    }
    Ok(())
}

fn lock_storage<T>(storage: &Mutex<T>) -> anyhow::Result<std::sync::MutexGuard<'_, T>> {
    storage
        .lock()
        .map_err(|_| anyhow::anyhow!("storage lock poisoned"))
}
