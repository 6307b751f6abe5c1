//! Append-only CSV log of single-record predictions.
//!
//! Each append renders the row (plus the header when the file is new or
//! empty) into one buffer and writes it with a single `write_all` on a
//! handle opened in append mode, so rows from separate appends never
//! interleave. Rows are never rewritten.

use crate::error::{LearningError, Result};
use chrono::NaiveDateTime;
use churn_processing::{ChurnLabel, CodeTable, Customer};
use polars::prelude::*;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Column order of the log file.
pub const LOG_COLUMNS: [&str; 12] = [
    "timestamp",
    "age",
    "gender",
    "tenure",
    "usage",
    "support_calls",
    "payment_delay",
    "subscription_type",
    "contract_length",
    "total_spend",
    "last_interaction",
    "prediction",
];

/// Timestamp format written to the log (microsecond precision).
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One logged prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionLogEntry {
    pub timestamp: NaiveDateTime,
    pub customer: Customer,
    pub prediction: ChurnLabel,
}

impl PredictionLogEntry {
    fn to_frame(&self) -> PolarsResult<DataFrame> {
        let c = &self.customer;
        df!(
            LOG_COLUMNS[0] => [self.timestamp.format(LOG_TIMESTAMP_FORMAT).to_string()],
            LOG_COLUMNS[1] => [c.age],
            LOG_COLUMNS[2] => [c.gender.as_str()],
            LOG_COLUMNS[3] => [c.tenure_months],
            LOG_COLUMNS[4] => [c.usage_frequency],
            LOG_COLUMNS[5] => [c.support_calls],
            LOG_COLUMNS[6] => [c.payment_delay_days],
            LOG_COLUMNS[7] => [c.subscription_type.as_str()],
            LOG_COLUMNS[8] => [c.contract_length.as_str()],
            LOG_COLUMNS[9] => [c.total_spend],
            LOG_COLUMNS[10] => [c.last_interaction_days],
            LOG_COLUMNS[11] => [self.prediction.outcome_text()]
        )
    }

    /// The entry as CSV bytes, optionally preceded by the header line.
    fn render(&self, include_header: bool) -> PolarsResult<Vec<u8>> {
        let mut frame = self.to_frame()?;
        let mut buffer = Vec::new();
        CsvWriter::new(&mut buffer)
            .include_header(include_header)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(&mut frame)?;
        Ok(buffer)
    }
}

/// Handle to the prediction log file.
#[derive(Debug, Clone)]
pub struct PredictionLog {
    path: PathBuf,
}

impl PredictionLog {
    /// The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::LogWrite`] if the file cannot be opened or
    /// written.
    pub fn append(&self, entry: &PredictionLogEntry) -> Result<()> {
        let log_error = |reason: String| LearningError::LogWrite {
            path: self.path.display().to_string(),
            reason,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| log_error(e.to_string()))?;

        let is_empty = file
            .metadata()
            .map_err(|e| log_error(e.to_string()))?
            .len()
            == 0;

        let buffer = entry
            .render(is_empty)
            .map_err(|e| log_error(e.to_string()))?;
        file.write_all(&buffer)
            .map_err(|e| log_error(e.to_string()))?;

        debug!(
            "Appended prediction to {} ({} bytes)",
            self.path.display(),
            buffer.len()
        );
        Ok(())
    }
}
