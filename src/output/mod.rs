//! Report exports.
//!
//! Supports a paginated PDF document, a multi-sheet XLSX workbook, a flat
//! CSV of daily summaries, and JSON.

pub mod document;
pub mod workbook;

use chrono::{NaiveDate, NaiveDateTime};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::{DateRange, ReportPeriod, resolve_display_name};
use crate::error::{ReportError, Result};
use crate::records::TrackingRecord;

pub use document::{DocumentOptions, render_document};
pub use workbook::render_workbook;

/// Output encodings a report can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Pdf,
    Xlsx,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// `dd/mm/yyyy`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// 12-hour clock with seconds, e.g. `05:30:00 PM`.
pub fn format_time(timestamp: NaiveDateTime) -> String {
    timestamp.format("%I:%M:%S %p").to_string()
}

/// Time cell for a bucket's first or last trip; blank when the bucket has
/// no trips.
pub fn format_trip_time(trip: Option<&TrackingRecord>) -> String {
    trip.map(|t| format_time(t.timestamp)).unwrap_or_default()
}

/// `dd/mm/yyyy to dd/mm/yyyy`
pub fn format_period(range: &DateRange) -> String {
    format!("{} to {}", format_date(range.start), format_date(range.end))
}

/// Options shared by every export format.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub document: DocumentOptions,
    /// The report was requested for every identifier at once. Workbooks
    /// then always carry a summary sheet, even for a single identifier.
    pub all_identifiers: bool,
}

/// Encodes `periods` in the requested format.
///
/// # Errors
///
/// Returns [`ReportError::NoData`] when there is nothing to export, either
/// no periods at all or periods without a single record.
pub fn render(
    format: ExportFormat,
    periods: &[ReportPeriod],
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    if periods.iter().all(ReportPeriod::is_empty) {
        return Err(ReportError::NoData);
    }
    debug!(format = format.extension(), periods = periods.len(), "Rendering export");
    match format {
        ExportFormat::Pdf => render_document(periods, &options.document),
        ExportFormat::Xlsx => render_workbook(periods, options.all_identifiers),
        ExportFormat::Csv => daily_csv(periods),
        ExportFormat::Json => to_json(periods).map(String::into_bytes),
    }
}

/// One CSV row per daily bucket.
#[derive(Debug, Serialize)]
pub struct DailySummaryRow {
    pub identifier: String,
    pub date: String,
    pub trips: usize,
    pub first_trip: String,
    pub last_trip: String,
    pub work_hours: String,
}

fn daily_rows(periods: &[ReportPeriod]) -> impl Iterator<Item = DailySummaryRow> + '_ {
    periods.iter().flat_map(|period| {
        period.buckets.iter().map(|bucket| DailySummaryRow {
            identifier: period.identifier.clone(),
            date: format_date(bucket.date),
            trips: bucket.trip_count(),
            first_trip: format_trip_time(bucket.first_trip()),
            last_trip: format_trip_time(bucket.last_trip()),
            work_hours: bucket.work_duration.to_string(),
        })
    })
}

fn daily_csv(periods: &[ReportPeriod]) -> Result<Vec<u8>> {
    if periods.is_empty() {
        return Err(ReportError::NoData);
    }
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for row in daily_rows(periods) {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))
}

/// Writes the daily summaries of every period to a CSV file at `path`.
pub fn write_daily_csv(path: &Path, periods: &[ReportPeriod]) -> Result<()> {
    let bytes = daily_csv(periods)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Writing daily summary CSV");
    fs::write(path, bytes)?;
    Ok(())
}

/// Serializes periods as pretty-printed JSON.
pub fn to_json(periods: &[ReportPeriod]) -> Result<String> {
    if periods.is_empty() {
        return Err(ReportError::NoData);
    }
    Ok(serde_json::to_string_pretty(periods)?)
}

/// Logs a period's summary and daily table.
pub fn log_summary(period: &ReportPeriod) {
    let name = resolve_display_name(&period.records, period.kind);
    info!(
        identifier = %period.identifier,
        name = %name,
        period = %format_period(&period.range),
        trips = period.totals.trip_count,
        days = period.totals.day_count,
        hours = %period.totals.work_duration,
        avg_hours_per_day = period.totals.average_hours_per_day,
        "Report summary"
    );

    for bucket in &period.buckets {
        info!(
            date = %format_date(bucket.date),
            trips = bucket.trip_count(),
            first_trip = %format_trip_time(bucket.first_trip()),
            last_trip = %format_trip_time(bucket.last_trip()),
            work_hours = %bucket.work_duration,
            "Day"
        );
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::analyzers::{DateRange, ReportPeriod, ReportScope, aggregate};
    use crate::records::{IdentifierKind, TrackingRecord};
    use chrono::NaiveDate;

    pub fn record(identifier: &str, raw: &str, source: &str) -> TrackingRecord {
        TrackingRecord {
            identifier: identifier.to_string(),
            kind: IdentifierKind::Ibutton,
            timestamp: raw.parse().unwrap(),
            address: "Main St 1".to_string(),
            latitude: 37.98,
            longitude: 23.72,
            source: Some(source.to_string()),
        }
    }

    pub fn scope() -> ReportScope {
        ReportScope {
            kind: IdentifierKind::Ibutton,
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            ),
        }
    }

    /// Identifier `A`: 2025-01-01 08:00 and 17:30, 2025-01-02 09:00.
    pub fn sample_period(identifier: &str) -> ReportPeriod {
        let records = vec![
            record(identifier, "2025-01-01T08:00:00", "Nikos"),
            record(identifier, "2025-01-01T17:30:00", "Nikos"),
            record(identifier, "2025-01-02T09:00:00", "Nikos"),
        ];
        aggregate(identifier, &scope(), &records)
    }
}
