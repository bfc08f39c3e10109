//! Sink module: where extracted articles end up
//!
//! The pipeline only knows the [`ArticleSink`] trait. Any
//! `Fn(&str, &str) -> Result<(), SinkError>` closure is a sink, and
//! [`StorageSink`] writes into the crate's SQLite store.

use crate::storage::{SqliteStorage, Storage, StorageError};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors a sink may report for a single article
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Article rejected: {0}")]
    Rejected(String),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Persists one extracted article
///
/// Implementations must be thread-safe: every worker in the pool calls the
/// same sink concurrently. A returned error fails only the current job.
pub trait ArticleSink: Send + Sync {
    fn persist(&self, title: &str, content: &str) -> Result<(), SinkError>;
}

impl<F> ArticleSink for F
where
    F: Fn(&str, &str) -> Result<(), SinkError> + Send + Sync,
{
    fn persist(&self, title: &str, content: &str) -> Result<(), SinkError> {
        self(title, content)
    }
}

/// Sink writing articles into shared storage, tagged with a run id
pub struct StorageSink {
    storage: Arc<Mutex<SqliteStorage>>,
    run_id: i64,
}

impl StorageSink {
    /// Creates a sink that attributes every article to `run_id`
    pub fn new(storage: Arc<Mutex<SqliteStorage>>, run_id: i64) -> Self {
        Self { storage, run_id }
    }
}

impl ArticleSink for StorageSink {
    fn persist(&self, title: &str, content: &str) -> Result<(), SinkError> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|_| SinkError::Unavailable("storage lock poisoned".to_string()))?;
        storage.insert_article(self.run_id, title, content)?;
        Ok(())
    }
}
