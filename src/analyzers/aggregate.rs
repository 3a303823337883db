use crate::analyzers::types::{
    DailyBucket, PeriodTotals, ReportPeriod, ReportScope, WorkDuration,
};
use crate::analyzers::utility::average_hours_per_day;
use crate::records::TrackingRecord;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Aggregates one identifier's records into a [`ReportPeriod`].
///
/// Records are bucketed by calendar day in first-encounter order. Each
/// bucket's trips are stably sorted by timestamp, so records sharing a
/// timestamp keep their input order. Empty input gives an empty period with
/// zero totals.
pub fn aggregate(identifier: &str, scope: &ReportScope, records: &[TrackingRecord]) -> ReportPeriod {
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();
    let mut days: Vec<(NaiveDate, Vec<TrackingRecord>)> = Vec::new();

    for record in records {
        let date = record.date();
        let slot = *index.entry(date).or_insert_with(|| {
            days.push((date, Vec::new()));
            days.len() - 1
        });
        days[slot].1.push(record.clone());
    }

    let buckets: Vec<DailyBucket> = days
        .into_iter()
        .map(|(date, trips)| daily_bucket(date, trips))
        .collect();

    let work_duration: WorkDuration = buckets.iter().map(|b| b.work_duration).sum();
    let day_count = buckets.len();

    ReportPeriod {
        identifier: identifier.to_string(),
        kind: scope.kind,
        range: scope.range,
        totals: PeriodTotals {
            trip_count: buckets.iter().map(DailyBucket::trip_count).sum(),
            day_count,
            work_duration,
            average_hours_per_day: average_hours_per_day(work_duration, day_count),
        },
        buckets,
        records: records.to_vec(),
    }
}

fn daily_bucket(date: NaiveDate, mut trips: Vec<TrackingRecord>) -> DailyBucket {
    trips.sort_by_key(|r| r.timestamp);

    let work_duration = match (trips.first(), trips.last()) {
        (Some(first), Some(last)) => WorkDuration::from_delta(last.timestamp - first.timestamp),
        _ => WorkDuration::default(),
    };

    DailyBucket {
        date,
        trips,
        work_duration,
    }
}

/// Aggregates each identifier's records independently.
///
/// Returns exactly one period per input entry, in input order. Totals are
/// never combined across identifiers.
pub fn aggregate_grouped(
    scope: &ReportScope,
    records_by_identifier: &[(String, Vec<TrackingRecord>)],
) -> Vec<ReportPeriod> {
    records_by_identifier
        .iter()
        .map(|(identifier, records)| aggregate(identifier, scope, records))
        .collect()
}

/// Partitions records by identifier in first-encounter order.
pub fn group_by_identifier(records: &[TrackingRecord]) -> Vec<(String, Vec<TrackingRecord>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<TrackingRecord>)> = Vec::new();

    for record in records {
        let slot = *index.entry(record.identifier.as_str()).or_insert_with(|| {
            groups.push((record.identifier.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(record.clone());
    }

    groups
}
