//! Input module for reading ingestion rows
//!
//! This module turns a CSV byte stream into ingestion jobs:
//! - Header validation and column lookup (`reader`)
//! - Mapping raw records to typed jobs, dropping incomplete rows (`extractor`)

mod extractor;
mod reader;

pub use extractor::{extract_job, IngestJob, RowSkipped, SkipReason};
pub use reader::{ColumnLayout, RawRecord, RowReader, TITLE_COLUMN, URL_COLUMN};

use crate::IngestError;
use std::io::Read;

/// Row counts gathered by [`scan`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSummary {
    /// Data rows read (header excluded)
    pub rows_read: u64,

    /// Rows that would become jobs
    pub valid_rows: u64,

    /// Rows dropped for a missing title or url
    pub skipped_rows: u64,
}

/// Reads an entire input without fetching anything
///
/// Applies the same header validation and row filtering as a real run, so
/// the counts match what the pipeline would enqueue.
///
/// # Returns
///
/// * `Ok(InputSummary)` - Row counts for the input
/// * `Err(IngestError::MalformedInput)` - Header lacks a required column
/// * `Err(IngestError::InputRead)` - The stream failed mid-read
pub fn scan<R: Read>(input: R) -> Result<InputSummary, IngestError> {
    let mut rows = RowReader::new(input)?;
    let layout = rows.layout();
    let mut summary = InputSummary::default();

    for raw in &mut rows {
        let raw = raw?;
        summary.rows_read += 1;
        match extract_job(&raw, &layout) {
            Ok(_) => summary.valid_rows += 1,
            Err(skipped) => {
                tracing::debug!("{}", skipped);
                summary.skipped_rows += 1;
            }
        }
    }

    Ok(summary)
}
