//! Output module for presenting ingestion results
//!
//! This module handles:
//! - Printing the report of a finished run
//! - Loading and printing statistics kept in the article database

pub mod stats;

pub use stats::{load_statistics, print_statistics, run_duration_seconds, IngestStatistics};

use crate::pipeline::{FailureStage, RunReport};

/// Maximum number of individual failures listed by [`print_report`]
pub const MAX_LISTED_FAILURES: usize = 20;

/// Prints a run report to stdout
///
/// # Arguments
///
/// * `report` - The report returned by the pipeline
pub fn print_report(report: &RunReport) {
    println!("=== Ingest Report ===\n");

    println!("Run:");
    println!("  Final state: {}", report.final_state);
    if report.cancelled {
        println!("  Cancelled: input stopped early");
    }
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    println!();

    println!("Input:");
    println!("  Rows read: {}", report.rows_read);
    println!("  Rows skipped: {}", report.rows_skipped);
    println!("  Jobs enqueued: {}", report.jobs_enqueued);
    println!();

    println!("Jobs:");
    println!("  Completed: {}", report.jobs_completed);
    println!("  Persisted: {}", report.persisted);
    for stage in [FailureStage::Fetch, FailureStage::Extract, FailureStage::Persist] {
        println!("  Failed at {}: {}", stage, stage_count(report, stage));
    }
    println!();

    if !report.failures.is_empty() {
        println!("Failures ({}):", report.failures.len());
        for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
            let row = failure
                .row
                .map(|line| format!("line {}", line))
                .unwrap_or_else(|| "line ?".to_string());
            println!(
                "  - [{}] {} ({}) {}: {}",
                failure.stage, failure.title, row, failure.source_url, failure.cause
            );
        }
        if report.failures.len() > MAX_LISTED_FAILURES {
            println!(
                "  ... and {} more",
                report.failures.len() - MAX_LISTED_FAILURES
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} jobs persisted)",
        success_rate(report),
        report.persisted,
        report.jobs_enqueued
    );
}

fn stage_count(report: &RunReport, stage: FailureStage) -> u64 {
    match stage {
        FailureStage::Fetch => report.fetch_failures,
        FailureStage::Extract => report.extract_failures,
        FailureStage::Persist => report.persist_failures,
    }
}

/// Percentage of enqueued jobs that reached the sink successfully
pub fn success_rate(report: &RunReport) -> f64 {
    if report.jobs_enqueued == 0 {
        0.0
    } else {
        (report.persisted as f64 / report.jobs_enqueued as f64) * 100.0
    }
}
