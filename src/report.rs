//! Report requests: validation and turning fetched records into periods.

use chrono::NaiveDate;
use tracing::debug;

use crate::analyzers::{
    DateRange, ReportPeriod, ReportScope, aggregate, aggregate_grouped, group_by_identifier,
};
use crate::error::{ReportError, Result};
use crate::records::{IdentifierKind, TrackingRecord};

/// Identifier value selecting every identifier at once.
pub const ALL_IDENTIFIERS: &str = "all";

const ILLEGAL_FILE_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// What the user asked a report for.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub identifier: String,
    pub kind: IdentifierKind,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ReportRequest {
    pub fn new(
        identifier: &str,
        kind: IdentifierKind,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Self {
        Self {
            identifier: identifier.trim().to_string(),
            kind,
            start,
            end,
        }
    }

    /// Whether the `all` sentinel was selected (case-insensitive).
    pub fn is_all(&self) -> bool {
        self.identifier.eq_ignore_ascii_case(ALL_IDENTIFIERS)
    }

    /// Checks the request before anything is fetched or computed.
    pub fn validate(&self) -> Result<ReportScope> {
        if self.identifier.is_empty() {
            return Err(ReportError::MissingIdentifier);
        }
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Err(ReportError::MissingDateRange);
        };
        if start > end {
            return Err(ReportError::InvalidDateRange { start, end });
        }
        Ok(ReportScope {
            kind: self.kind,
            range: DateRange::new(start, end),
        })
    }

    /// `start_date` / `end_date` query values for the backend.
    ///
    /// The backend compares ISO strings, so the end bound is pushed to the
    /// last second of the day to keep it inclusive.
    pub fn query_bounds(&self) -> Result<(String, String)> {
        let scope = self.validate()?;
        Ok((
            scope.range.start.format("%Y-%m-%d").to_string(),
            format!("{}T23:59:59", scope.range.end.format("%Y-%m-%d")),
        ))
    }

    /// Aggregates fetched records into the periods to render.
    ///
    /// Records outside the requested dates are dropped. A single identifier
    /// yields one period; the `all` sentinel yields one period per
    /// identifier in first-encounter order.
    pub fn build_periods(&self, records: &[TrackingRecord]) -> Result<Vec<ReportPeriod>> {
        let scope = self.validate()?;

        let in_range: Vec<TrackingRecord> = records
            .iter()
            .filter(|r| scope.range.contains(r.date()))
            .cloned()
            .collect();
        if in_range.len() != records.len() {
            debug!(
                dropped = records.len() - in_range.len(),
                "Dropped records outside the requested range"
            );
        }

        if self.is_all() {
            let groups = group_by_identifier(&in_range);
            debug!(identifiers = groups.len(), "Aggregating grouped report");
            Ok(aggregate_grouped(&scope, &groups))
        } else {
            Ok(vec![aggregate(&self.identifier, &scope, &in_range)])
        }
    }

    /// Export file name, e.g. `Report_01A2_2025-01-01_2025-01-31.pdf`.
    ///
    /// Path separators and other characters not allowed in file names are
    /// replaced with `_`, so the name always stays in the current directory.
    pub fn export_file_name(&self, extension: &str) -> String {
        let date = |d: Option<NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        format!(
            "Report_{}_{}_{}.{}",
            file_name_part(&self.identifier),
            date(self.start),
            date(self.end),
            extension
        )
    }
}

fn file_name_part(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_control() || ILLEGAL_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn record(identifier: &str, raw: &str) -> TrackingRecord {
        TrackingRecord {
            identifier: identifier.to_string(),
            kind: IdentifierKind::Vehicle,
            timestamp: raw.parse().unwrap(),
            address: "Depot".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            source: None,
        }
    }

    #[test]
    fn test_validate_missing_identifier() {
        let req = ReportRequest::new("  ", IdentifierKind::Vehicle, Some(date(1, 1)), Some(date(1, 2)));
        assert!(matches!(req.validate(), Err(ReportError::MissingIdentifier)));
    }

    #[test]
    fn test_validate_missing_range() {
        let req = ReportRequest::new("V1", IdentifierKind::Vehicle, Some(date(1, 1)), None);
        assert!(matches!(req.validate(), Err(ReportError::MissingDateRange)));
    }

    #[test]
    fn test_validate_inverted_range() {
        let req = ReportRequest::new("V1", IdentifierKind::Vehicle, Some(date(2, 1)), Some(date(1, 1)));
        assert!(matches!(
            req.validate(),
            Err(ReportError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_is_all_case_insensitive() {
        let req = ReportRequest::new("ALL", IdentifierKind::Ibutton, None, None);
        assert!(req.is_all());
    }

    #[test]
    fn test_query_bounds_make_end_inclusive() {
        let req = ReportRequest::new("V1", IdentifierKind::Vehicle, Some(date(1, 1)), Some(date(1, 2)));
        let (start, end) = req.query_bounds().unwrap();
        assert_eq!(start, "2025-01-01");
        assert_eq!(end, "2025-01-02T23:59:59");
    }

    #[test]
    fn test_build_periods_single() {
        let req = ReportRequest::new("V1", IdentifierKind::Vehicle, Some(date(1, 1)), Some(date(1, 2)));
        let records = vec![
            record("V1", "2025-01-01T08:00:00"),
            record("V1", "2025-01-02T08:00:00"),
            record("V1", "2025-01-03T08:00:00"),
        ];
        let periods = req.build_periods(&records).unwrap();

        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].identifier, "V1");
        assert_eq!(periods[0].totals.trip_count, 2);
        assert_eq!(periods[0].range, DateRange::new(date(1, 1), date(1, 2)));
    }

    #[test]
    fn test_build_periods_all() {
        let req = ReportRequest::new("all", IdentifierKind::Vehicle, Some(date(1, 1)), Some(date(1, 31)));
        let records = vec![
            record("V1", "2025-01-01T08:00:00"),
            record("V2", "2025-01-01T09:00:00"),
            record("V1", "2025-01-01T10:00:00"),
        ];
        let periods = req.build_periods(&records).unwrap();

        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].identifier, "V1");
        assert_eq!(periods[0].totals.trip_count, 2);
        assert_eq!(periods[1].identifier, "V2");
    }

    #[test]
    fn test_build_periods_rejects_invalid_request() {
        let req = ReportRequest::new("V1", IdentifierKind::Vehicle, None, None);
        assert!(req.build_periods(&[]).is_err());
    }

    #[test]
    fn test_export_file_name() {
        let req = ReportRequest::new("01A2", IdentifierKind::Ibutton, Some(date(1, 1)), Some(date(1, 31)));
        assert_eq!(
            req.export_file_name("pdf"),
            "Report_01A2_2025-01-01_2025-01-31.pdf"
        );
    }

    #[test]
    fn test_export_file_name_replaces_path_separators() {
        let req = ReportRequest::new(
            "(23) LAB/375",
            IdentifierKind::Vehicle,
            Some(date(1, 1)),
            Some(date(1, 31)),
        );
        let name = req.export_file_name("xlsx");

        assert_eq!(name, "Report_(23) LAB_375_2025-01-01_2025-01-31.xlsx");
        assert_eq!(std::path::Path::new(&name).components().count(), 1);
    }
}
