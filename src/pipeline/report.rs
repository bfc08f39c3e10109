//! Structured per-run results
//!
//! Workers record every job outcome here instead of only logging it, so a
//! caller can tell how many articles made it and why the others did not.

use crate::input::IngestJob;
use crate::pipeline::RunState;
use crate::storage::RunTotals;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Stage of the per-job flow at which a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    Fetch,
    Extract,
    Persist,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Persist => "persist",
        };
        write!(f, "{}", name)
    }
}

/// Result of processing one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Persisted,
    Failed { stage: FailureStage, cause: String },
}

impl JobOutcome {
    pub fn failed(stage: FailureStage, cause: impl fmt::Display) -> Self {
        Self::Failed {
            stage,
            cause: cause.to_string(),
        }
    }
}

/// A job that did not end up persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub title: String,
    pub source_url: String,
    pub row: Option<u64>,
    pub stage: FailureStage,
    pub cause: String,
}

/// Summary of one pipeline run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// State the run finished in
    pub final_state: RunState,

    /// Data rows read from the input
    pub rows_read: u64,

    /// Rows dropped for a missing title or url
    pub rows_skipped: u64,

    /// Jobs handed to the queue
    pub jobs_enqueued: u64,

    /// Completion signals received from workers
    pub jobs_completed: u64,

    /// Jobs whose article reached the sink successfully
    pub persisted: u64,

    pub fetch_failures: u64,
    pub extract_failures: u64,
    pub persist_failures: u64,

    /// Every failed job, in completion order
    pub failures: Vec<JobFailure>,

    /// Input reading stopped early on cancellation
    pub cancelled: bool,

    pub elapsed: Duration,
}

impl RunReport {
    /// Total failed jobs across all stages
    pub fn failed(&self) -> u64 {
        self.fetch_failures + self.extract_failures + self.persist_failures
    }

    /// Returns true if every enqueued job signalled completion
    pub fn is_drained(&self) -> bool {
        self.jobs_completed == self.jobs_enqueued
    }

    /// Failures at a given stage
    pub fn failures_at(&self, stage: FailureStage) -> impl Iterator<Item = &JobFailure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }

    /// Counters in the shape stored with run records
    pub fn totals(&self) -> RunTotals {
        RunTotals {
            rows_read: self.rows_read,
            rows_skipped: self.rows_skipped,
            jobs_enqueued: self.jobs_enqueued,
            persisted: self.persisted,
            failed: self.failed(),
        }
    }
}

/// Thread-safe accumulator shared by the producer and all workers
#[derive(Debug, Default)]
pub(crate) struct ReportCollector {
    rows_read: AtomicU64,
    rows_skipped: AtomicU64,
    jobs_enqueued: AtomicU64,
    persisted: AtomicU64,
    fetch_failures: AtomicU64,
    extract_failures: AtomicU64,
    persist_failures: AtomicU64,
    cancelled: AtomicBool,
    failures: Mutex<Vec<JobFailure>>,
}

impl ReportCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_row_read(&self) {
        self.rows_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skip(&self) {
        self.rows_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_enqueued(&self) {
        self.jobs_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, job: &IngestJob, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Persisted => {
                self.persisted.fetch_add(1, Ordering::Relaxed);
            }
            JobOutcome::Failed { stage, cause } => {
                let counter = match stage {
                    FailureStage::Fetch => &self.fetch_failures,
                    FailureStage::Extract => &self.extract_failures,
                    FailureStage::Persist => &self.persist_failures,
                };
                counter.fetch_add(1, Ordering::Relaxed);

                let failure = JobFailure {
                    title: job.title.clone(),
                    source_url: job.source_url.clone(),
                    row: job.row,
                    stage,
                    cause,
                };
                self.failures
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(failure);
            }
        }
    }

    /// Snapshots the counters into a report, taking the failure list
    pub(crate) fn finish(
        &self,
        final_state: RunState,
        jobs_completed: u64,
        elapsed: Duration,
    ) -> RunReport {
        let failures = std::mem::take(
            &mut *self
                .failures
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );

        RunReport {
            final_state,
            rows_read: self.rows_read.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
            jobs_enqueued: self.jobs_enqueued.load(Ordering::Relaxed),
            jobs_completed,
            persisted: self.persisted.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            extract_failures: self.extract_failures.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            failures,
            cancelled: self.cancelled.load(Ordering::Relaxed),
            elapsed,
        }
    }
}
