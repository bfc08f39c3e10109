//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{RunRecord, RunStatus, RunTotals};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Covers run bookkeeping and article persistence. Callers share a backend
/// across workers behind a mutex, so methods take `&mut self` for writes.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new ingestion run in the `Running` status
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `input_name` - Name of the input being ingested
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, input_name: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Lists the most recent runs, newest first
    fn list_recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    /// Records the final status and counters of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus, totals: &RunTotals)
        -> StorageResult<()>;

    // ===== Articles =====

    /// Inserts an article and returns its ID
    fn insert_article(&mut self, run_id: i64, title: &str, content: &str) -> StorageResult<i64>;

    /// Counts all stored articles
    fn count_articles(&self) -> StorageResult<u64>;

    /// Counts the articles written by one run
    fn count_articles_for_run(&self, run_id: i64) -> StorageResult<u64>;
}
