//! Normalized access-log entries and the two line parsers that produce them
//! (one structured JSON record per line, or classic combined-format text).

mod combined;
mod entry;
mod error;
mod json;

pub use combined::CombinedReader;
pub use entry::{Headers, LogEntry, LogRequest};
pub use error::ParseError;
pub use json::JsonReader;

use std::io::BufRead;

/// Input line grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One self-contained JSON record per line.
    Json,
    /// Apache combined log format text lines.
    Combined,
}

/// A forward-only reader over an open log stream. `next_entry` yields one
/// entry at a time; `Ok(None)` is clean end-of-input, any `Err` is fatal for
/// the run.
pub enum LogReader<R: BufRead> {
    Json(JsonReader<R>),
    Combined(CombinedReader<R>),
}

impl<R: BufRead> LogReader<R> {
    pub fn new(format: LogFormat, input: R) -> Self {
        match format {
            LogFormat::Json => LogReader::Json(JsonReader::new(input)),
            LogFormat::Combined => LogReader::Combined(CombinedReader::new(input)),
        }
    }

    pub fn next_entry(&mut self) -> Result<Option<LogEntry>, ParseError> {
        match self {
            LogReader::Json(r) => r.next_entry(),
            LogReader::Combined(r) => r.next_entry(),
        }
    }
}
