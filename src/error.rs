//! Error types for report generation and export.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while validating a report request or exporting a report.
///
/// Aggregation itself never fails; everything here is either caught before
/// aggregation starts or raised by an encoder.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("please select an identifier")]
    MissingIdentifier,

    #[error("please select a date range")]
    MissingDateRange,

    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid time format: {0}")]
    InvalidTime(String),

    #[error("no tracking data to export")]
    NoData,

    #[error("document encoding failed: {0}")]
    Document(String),

    #[error("workbook encoding failed: {0}")]
    Workbook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience Result alias that defaults to [`ReportError`].
pub type Result<T> = std::result::Result<T, ReportError>;
