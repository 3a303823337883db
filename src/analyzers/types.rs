//! Data types produced by the aggregation pipeline.

use std::fmt;

use chrono::{NaiveDate, TimeDelta};
use serde::Serialize;

use crate::records::{IdentifierKind, TrackingRecord};

const MS_PER_MINUTE: i64 = 60 * 1000;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Elapsed working time, kept as raw milliseconds so sums never compound
/// rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct WorkDuration {
    millis: i64,
}

impl WorkDuration {
    pub fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub fn from_delta(delta: TimeDelta) -> Self {
        Self::from_millis(delta.num_milliseconds())
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Whole hours, floored.
    pub fn hours(&self) -> i64 {
        self.millis.div_euclid(MS_PER_HOUR)
    }

    /// Minutes left over after [`hours`](Self::hours), floored.
    pub fn minutes(&self) -> i64 {
        self.millis.rem_euclid(MS_PER_HOUR).div_euclid(MS_PER_MINUTE)
    }
}

impl std::ops::Add for WorkDuration {
    type Output = WorkDuration;

    fn add(self, rhs: Self) -> Self::Output {
        WorkDuration::from_millis(self.millis + rhs.millis)
    }
}

impl std::iter::Sum for WorkDuration {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(WorkDuration::default(), |acc, d| acc + d)
    }
}

impl fmt::Display for WorkDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours(), self.minutes())
    }
}

/// Inclusive date bounds of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Smallest range covering every record, or `None` for no records.
    pub fn spanning(records: &[TrackingRecord]) -> Option<Self> {
        let start = records.iter().map(TrackingRecord::date).min()?;
        let end = records.iter().map(TrackingRecord::date).max()?;
        Some(Self { start, end })
    }
}

/// What a report covers: the kind of identifier and the requested dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportScope {
    pub kind: IdentifierKind,
    pub range: DateRange,
}

/// All trips recorded on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    /// Sorted ascending by timestamp. Non-empty when built by
    /// [`aggregate`](super::aggregate).
    pub trips: Vec<TrackingRecord>,
    pub work_duration: WorkDuration,
}

impl DailyBucket {
    /// Check-in: earliest trip of the day.
    pub fn first_trip(&self) -> Option<&TrackingRecord> {
        self.trips.first()
    }

    /// Check-out: latest trip of the day.
    pub fn last_trip(&self) -> Option<&TrackingRecord> {
        self.trips.last()
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }
}

/// Period-level statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeriodTotals {
    pub trip_count: usize,
    pub day_count: usize,
    pub work_duration: WorkDuration,
    /// `floor(total hours / days)`, `0` with no days.
    pub average_hours_per_day: i64,
}

/// Aggregated report data for one identifier (or the `all` sentinel).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPeriod {
    pub identifier: String,
    pub kind: IdentifierKind,
    pub range: DateRange,
    /// In first-encounter order unless reordered with
    /// [`chronological`](Self::chronological).
    pub buckets: Vec<DailyBucket>,
    /// The period's records in received order.
    pub records: Vec<TrackingRecord>,
    pub totals: PeriodTotals,
}

impl ReportPeriod {
    pub fn bucket(&self, date: NaiveDate) -> Option<&DailyBucket> {
        self.buckets.iter().find(|b| b.date == date)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the period with buckets sorted by date.
    pub fn chronological(mut self) -> Self {
        self.buckets.sort_by_key(|b| b.date);
        self
    }
}
