//! Trip aggregation.
//!
//! Groups raw tracking records into per-day buckets, derives check-in and
//! check-out trips and elapsed work hours, and rolls them up into
//! per-identifier report periods.

pub mod aggregate;
pub mod display;
pub mod types;
pub mod utility;

pub use aggregate::{aggregate, aggregate_grouped, group_by_identifier};
pub use display::{group_display_name, resolve_display_name};
pub use types::{DailyBucket, DateRange, PeriodTotals, ReportPeriod, ReportScope, WorkDuration};
