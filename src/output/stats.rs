//! Statistics generation from the article database
//!
//! This module provides functionality for extracting and displaying
//! ingestion statistics from the storage layer.

use crate::storage::{RunRecord, RunStatus, Storage};
use crate::IngestError;

/// Number of runs shown by `--stats`
pub const RECENT_RUN_LIMIT: usize = 10;

/// Ingestion statistics summary
#[derive(Debug, Clone)]
pub struct IngestStatistics {
    /// Total number of articles across all runs
    pub total_articles: u64,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(IngestStatistics)` - Successfully loaded statistics
/// * `Err(IngestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<IngestStatistics, IngestError> {
    let total_articles = storage.count_articles()?;
    let recent_runs = storage.list_recent_runs(RECENT_RUN_LIMIT)?;

    Ok(IngestStatistics {
        total_articles,
        recent_runs,
    })
}

/// Seconds between a run's start and finish, if it finished
pub fn run_duration_seconds(run: &RunRecord) -> Option<i64> {
    let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    let finished = run
        .finished_at
        .as_deref()?
        .parse::<chrono::DateTime<chrono::Utc>>()
        .ok()?;
    Some((finished - started).num_seconds())
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &IngestStatistics) {
    println!("=== Ingest Statistics ===\n");

    println!("Overview:");
    println!("  Total articles: {}", stats.total_articles);
    println!("  Runs shown: {}", stats.recent_runs.len());
    println!();

    if stats.recent_runs.is_empty() {
        println!("No runs recorded yet");
        return;
    }

    println!("Recent Runs:");
    for run in &stats.recent_runs {
        let duration = run_duration_seconds(run)
            .map(|secs| format!("{}s", secs))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  #{} {} [{}] input={} duration={}",
            run.id,
            run.started_at,
            run.status.to_db_string(),
            run.input_name,
            duration
        );
        if run.status != RunStatus::Running {
            println!(
                "      rows={} skipped={} enqueued={} persisted={} failed={}",
                run.totals.rows_read,
                run.totals.rows_skipped,
                run.totals.jobs_enqueued,
                run.totals.persisted,
                run.totals.failed
            );
        }
    }
}
