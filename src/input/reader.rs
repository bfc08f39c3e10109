//! Streaming CSV row reader
//!
//! Validates the header before handing out any data row, then yields raw
//! records lazily so arbitrarily large inputs never sit in memory at once.
//! Records are kept as bytes; decoding happens per field in the extractor,
//! so a badly encoded cell never stops the stream.

use crate::IngestError;
use csv::{ByteRecord, ReaderBuilder};
use std::io::Read;

/// Header name of the title column
pub const TITLE_COLUMN: &str = "title";

/// Header name of the source URL column
pub const URL_COLUMN: &str = "url";

/// Positions of the required columns within a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub title: usize,
    pub url: usize,
}

impl ColumnLayout {
    /// Locates the required columns in a header record
    ///
    /// Matching is exact and case-sensitive. When a name appears more than
    /// once the last occurrence wins.
    pub fn from_header(header: &ByteRecord) -> Result<Self, IngestError> {
        let position = |name: &str| {
            header
                .iter()
                .enumerate()
                .filter(|(_, field)| *field == name.as_bytes())
                .map(|(idx, _)| idx)
                .last()
        };

        match (position(TITLE_COLUMN), position(URL_COLUMN)) {
            (Some(title), Some(url)) => Ok(Self { title, url }),
            (title, url) => {
                let mut missing = Vec::new();
                if title.is_none() {
                    missing.push(TITLE_COLUMN);
                }
                if url.is_none() {
                    missing.push(URL_COLUMN);
                }
                Err(IngestError::MalformedInput(format!(
                    "header is missing required column(s): {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

/// One data row as read from the input
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 1-based line number the record started on
    pub line: Option<u64>,

    /// The row's fields, undecoded
    pub record: ByteRecord,
}

/// Lazy reader over the data rows of a CSV input
pub struct RowReader<R: Read> {
    reader: csv::Reader<R>,
    layout: ColumnLayout,
}

impl<R: Read> RowReader<R> {
    /// Opens a reader and validates its header
    ///
    /// Every data row must have as many fields as the header; a row that
    /// does not is a read error.
    ///
    /// # Returns
    ///
    /// * `Ok(RowReader)` - Header contains both `title` and `url`
    /// * `Err(IngestError::MalformedInput)` - Header is unreadable or lacks a column
    pub fn new(input: R) -> Result<Self, IngestError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(input);

        let header = reader
            .byte_headers()
            .map_err(|e| IngestError::MalformedInput(format!("unreadable header: {}", e)))?;
        let layout = ColumnLayout::from_header(header)?;

        tracing::debug!(
            "Input header validated (title column {}, url column {})",
            layout.title,
            layout.url
        );

        Ok(Self { reader, layout })
    }

    /// Returns the located column positions
    pub fn layout(&self) -> ColumnLayout {
        self.layout
    }
}

impl<R: Read> Iterator for RowReader<R> {
    type Item = Result<RawRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = ByteRecord::new();
        match self.reader.read_byte_record(&mut record) {
            Ok(true) => Some(Ok(RawRecord {
                line: record.position().map(|p| p.line()),
                record,
            })),
            Ok(false) => None,
            Err(source) => Some(Err(IngestError::InputRead {
                line: source.position().map(|p| p.line()),
                source,
            })),
        }
    }
}
