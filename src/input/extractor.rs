//! Maps raw records to ingestion jobs

use crate::input::reader::{ColumnLayout, RawRecord};
use std::borrow::Cow;
use std::fmt;

/// One unit of ingestion work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestJob {
    /// Article title, persisted as-is
    pub title: String,

    /// URL the article body is fetched from
    pub source_url: String,

    /// Input line the job came from
    pub row: Option<u64>,
}

/// Why a row did not become a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingTitle,
    MissingUrl,
}

/// A row dropped before enqueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSkipped {
    pub line: Option<u64>,
    pub reason: SkipReason,
}

impl fmt::Display for RowSkipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.reason {
            SkipReason::MissingTitle => "title is empty",
            SkipReason::MissingUrl => "url is empty",
        };
        match self.line {
            Some(line) => write!(f, "Skipping row at line {}: {}", line, what),
            None => write!(f, "Skipping row: {}", what),
        }
    }
}

/// Extracts a job from a raw record
///
/// Fields are taken verbatim apart from decoding: bytes that are not valid
/// UTF-8 become U+FFFD. A row with an empty title or url is skipped rather
/// than failing the run.
pub fn extract_job(raw: &RawRecord, layout: &ColumnLayout) -> Result<IngestJob, RowSkipped> {
    let title = field(raw, layout.title);
    let url = field(raw, layout.url);

    let reason = if title.is_empty() {
        Some(SkipReason::MissingTitle)
    } else if url.is_empty() {
        Some(SkipReason::MissingUrl)
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RowSkipped {
            line: raw.line,
            reason,
        }),
        None => Ok(IngestJob {
            title: title.into_owned(),
            source_url: url.into_owned(),
            row: raw.line,
        }),
    }
}

fn field(raw: &RawRecord, idx: usize) -> Cow<'_, str> {
    String::from_utf8_lossy(raw.record.get(idx).unwrap_or_default())
}
