//! Daily trip aggregation and report exports for fleet tracking data.
//!
//! Raw location pings for drivers (iButton tags) or vehicles are grouped into
//! per-day buckets with check-in/check-out times and work hours, then
//! exported as a PDF document, an XLSX workbook, CSV or JSON.

pub mod analyzers;
pub mod error;
pub mod fetch;
pub mod output;
pub mod records;
pub mod report;
