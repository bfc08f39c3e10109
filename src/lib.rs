//! Article Ingest: bulk article importer
//!
//! This crate reads a CSV of `(title, url)` rows, fetches every URL through a
//! fixed pool of workers, extracts the article body text from the returned
//! HTML and hands each `(title, content)` pair to a persistence sink.

pub mod config;
pub mod content;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod sink;
pub mod storage;

use thiserror::Error;

/// Main error type for ingestion runs
///
/// Only run-level failures show up here. Per-row and per-job failures are
/// absorbed by the pipeline and reported through [`pipeline::RunReport`].
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Input read error at line {line:?}: {source}")]
    InputRead {
        line: Option<u64>,
        source: csv::Error,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid run state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: pipeline::RunState,
        to: pipeline::RunState,
    },

    #[error("Worker task failed: {0}")]
    WorkerPanicked(String),

    /// A run stopped after workers started; enqueued jobs were drained first
    #[error("Run aborted after {} jobs ({} persisted): {cause}", .report.jobs_completed, .report.persisted)]
    Aborted {
        #[source]
        cause: Box<IngestError>,
        report: Box<pipeline::RunReport>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Report of the jobs that did run before an abort
    pub fn partial_report(&self) -> Option<&pipeline::RunReport> {
        match self {
            Self::Aborted { report, .. } => Some(&**report),
            _ => None,
        }
    }

    /// The underlying failure, unwrapping an abort
    pub fn root_cause(&self) -> &IngestError {
        match self {
            Self::Aborted { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid container selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use content::{ContentExtractor, ContentFetcher, FetchError, HttpFetcher, SelectorExtractor};
pub use input::IngestJob;
pub use pipeline::{Pipeline, PipelineSettings, RunReport, RunState};
pub use sink::{ArticleSink, SinkError};
