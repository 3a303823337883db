//! Tracking records as received from the backend or a local export file.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ReportError, Result};

/// Identifier reported by the backend for records with neither an iButton
/// nor a vehicle.
pub const UNKNOWN_IDENTIFIER: &str = "Unknown";

/// Address used for manually entered trips without one.
pub const MANUAL_ENTRY: &str = "Manual Entry";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// What a tracked identifier refers to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    /// A driver's iButton tag.
    #[default]
    Ibutton,
    /// A GPS-tracked vehicle.
    Vehicle,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Ibutton => "ibutton",
            IdentifierKind::Vehicle => "vehicle",
        }
    }

    /// Label for the person or vehicle the identifier belongs to.
    pub fn subject_label(&self) -> &'static str {
        match self {
            IdentifierKind::Ibutton => "Employee",
            IdentifierKind::Vehicle => "Vehicle",
        }
    }

    /// Label for the identifier value itself.
    pub fn id_label(&self) -> &'static str {
        match self {
            IdentifierKind::Ibutton => "iButton",
            IdentifierKind::Vehicle => "Vehicle ID",
        }
    }

    /// Generic name shown in place of a garbled source label.
    pub fn fallback_name(&self) -> &'static str {
        match self {
            IdentifierKind::Ibutton => "Driver",
            IdentifierKind::Vehicle => "Vehicle",
        }
    }

    pub fn plural_label(&self) -> &'static str {
        match self {
            IdentifierKind::Ibutton => "Employees",
            IdentifierKind::Vehicle => "Vehicles",
        }
    }
}

/// A single time-stamped location ping for one identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub identifier: String,
    pub kind: IdentifierKind,
    pub timestamp: NaiveDateTime,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Driver or vehicle name attached to the identifier.
    pub source: Option<String>,
}

impl TrackingRecord {
    /// Calendar day the record falls on, ignoring time of day.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// A record as stored and returned by the backend's record-query endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendRecord {
    #[serde(default)]
    pub record_type: Option<IdentifierKind>,
    pub date: String,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub ibutton: Option<String>,
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl BackendRecord {
    /// The iButton tag or vehicle this record is keyed on, falling back to
    /// [`UNKNOWN_IDENTIFIER`].
    pub fn identifier(&self) -> &str {
        non_empty(&self.ibutton)
            .or_else(|| non_empty(&self.vehicle))
            .unwrap_or(UNKNOWN_IDENTIFIER)
    }

    /// Converts into a [`TrackingRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidDate`] if `date` is not a recognised
    /// timestamp.
    pub fn into_tracking_record(self) -> Result<TrackingRecord> {
        let timestamp = parse_timestamp(&self.date)?;
        let kind = self.record_type.unwrap_or(if non_empty(&self.ibutton).is_some() {
            IdentifierKind::Ibutton
        } else {
            IdentifierKind::Vehicle
        });
        let identifier = self.identifier().to_string();
        let source = non_empty(&self.driver)
            .or_else(|| non_empty(&self.vehicle))
            .map(str::to_string);

        Ok(TrackingRecord {
            identifier,
            kind,
            timestamp,
            address: self.address,
            latitude: self.latitude,
            longitude: self.longitude,
            source,
        })
    }
}

/// Parses a timestamp as sent by the backend.
///
/// Naive ISO timestamps (with or without fractional seconds, `T` or space
/// separated) are taken as-is. RFC 3339 timestamps keep their wall-clock
/// time in the offset they carry.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = raw.parse::<NaiveDateTime>() {
        return Ok(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ts);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .map_err(|_| ReportError::InvalidDate(raw.to_string()))
}

/// Converts a batch of backend records, skipping rows whose timestamp
/// cannot be parsed.
pub fn from_backend(records: Vec<BackendRecord>) -> Vec<TrackingRecord> {
    let total = records.len();
    let converted: Vec<_> = records
        .into_iter()
        .filter_map(|record| {
            let raw_date = record.date.clone();
            let identifier = record.identifier().to_string();
            match record.into_tracking_record() {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!(identifier = %identifier, date = %raw_date, error = %e, "Skipping record");
                    None
                }
            }
        })
        .collect();

    debug!(total, kept = converted.len(), "Converted backend records");
    converted
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsFile {
    Envelope { records: Vec<BackendRecord> },
    Bare(Vec<BackendRecord>),
}

/// Loads tracking records from a local file.
///
/// `.csv` files are read as normalized records with headers
/// `identifier,kind,timestamp,address,latitude,longitude,source`. Anything
/// else is read as JSON: either a bare array of backend records or the
/// record-query response envelope.
pub fn load_records_file(path: &Path) -> Result<Vec<TrackingRecord>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    debug!(path = %path.display(), is_csv, "Loading records file");

    if is_csv {
        let mut rdr = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for result in rdr.deserialize() {
            let record: TrackingRecord = result?;
            rows.push(record);
        }
        return Ok(rows);
    }

    let file = File::open(path)?;
    let parsed: RecordsFile = serde_json::from_reader(file)?;
    let records = match parsed {
        RecordsFile::Envelope { records } => records,
        RecordsFile::Bare(records) => records,
    };
    Ok(from_backend(records))
}

/// Payload for the backend's manual trip endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualTrip {
    pub record_type: IdentifierKind,
    pub identifier: String,
    pub date: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
}

impl ManualTrip {
    /// Builds a manual trip for `identifier` at `date` + `time`.
    ///
    /// `time` is `HH:MM` or `HH:MM:SS`.
    pub fn new(kind: IdentifierKind, identifier: &str, date: NaiveDate, time: &str) -> Result<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() || identifier.eq_ignore_ascii_case("all") {
            return Err(ReportError::MissingIdentifier);
        }
        if !time.contains(':') {
            return Err(ReportError::InvalidTime(time.to_string()));
        }

        let time = if time.split(':').count() == 2 {
            format!("{time}:00")
        } else {
            time.to_string()
        };
        let parsed = NaiveTime::parse_from_str(&time, "%H:%M:%S")
            .map_err(|_| ReportError::InvalidTime(time.clone()))?;

        Ok(Self {
            record_type: kind,
            identifier: identifier.to_string(),
            date: date.and_time(parsed).format(TIMESTAMP_FORMAT).to_string(),
            address: MANUAL_ENTRY.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            driver: None,
            vehicle: None,
        })
    }

    /// Sets the address and coordinates; blanks keep the defaults.
    pub fn with_location(
        mut self,
        address: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Self {
        if let Some(address) = address.map(str::trim).filter(|a| !a.is_empty()) {
            self.address = address.to_string();
        }
        self.latitude = latitude.unwrap_or(0.0);
        self.longitude = longitude.unwrap_or(0.0);
        self
    }

    /// Attaches the driver or vehicle name, depending on the record type.
    pub fn with_label(mut self, label: &str) -> Self {
        match self.record_type {
            IdentifierKind::Ibutton => self.driver = Some(label.to_string()),
            IdentifierKind::Vehicle => self.vehicle = Some(label.to_string()),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 11, 3)
            .unwrap()
            .and_hms_opt(6, 12, 38)
            .unwrap();

        assert_eq!(parse_timestamp("2025-11-03T06:12:38").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-11-03 06:12:38").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2025-11-03T06:12:38.000Z").unwrap(),
            expected
        );
        assert_eq!(
            parse_timestamp("2025-11-03T06:12:38+02:00").unwrap(),
            expected
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("03/Nov/2025").unwrap_err();
        assert!(matches!(err, ReportError::InvalidDate(_)));
    }

    #[test]
    fn test_backend_ibutton_record() {
        let record = BackendRecord {
            record_type: Some(IdentifierKind::Ibutton),
            date: "2025-01-01T08:00:00".to_string(),
            driver: Some("Nikos".to_string()),
            ibutton: Some("01A2".to_string()),
            address: "Main St".to_string(),
            latitude: 37.9,
            longitude: 23.7,
            ..Default::default()
        }
        .into_tracking_record()
        .unwrap();

        assert_eq!(record.identifier, "01A2");
        assert_eq!(record.kind, IdentifierKind::Ibutton);
        assert_eq!(record.source.as_deref(), Some("Nikos"));
    }

    #[test]
    fn test_backend_vehicle_record_uses_vehicle_as_identifier_and_source() {
        let record = BackendRecord {
            date: "2025-01-01T08:00:00".to_string(),
            vehicle: Some("(23) LAB 375".to_string()),
            ..Default::default()
        }
        .into_tracking_record()
        .unwrap();

        assert_eq!(record.identifier, "(23) LAB 375");
        assert_eq!(record.kind, IdentifierKind::Vehicle);
        assert_eq!(record.source.as_deref(), Some("(23) LAB 375"));
    }

    #[test]
    fn test_backend_record_without_identifier_is_unknown() {
        let record = BackendRecord {
            date: "2025-01-01T08:00:00".to_string(),
            ibutton: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(record.identifier(), UNKNOWN_IDENTIFIER);
    }

    #[test]
    fn test_from_backend_skips_invalid_dates() {
        let records = vec![
            BackendRecord {
                date: "2025-01-01T08:00:00".to_string(),
                ibutton: Some("A".to_string()),
                ..Default::default()
            },
            BackendRecord {
                date: "not a date".to_string(),
                ibutton: Some("A".to_string()),
                ..Default::default()
            },
        ];
        assert_eq!(from_backend(records).len(), 1);
    }

    #[test]
    fn test_load_records_file_json_envelope() {
        let path = temp_path("trip_report_test_envelope.json");
        fs::write(
            &path,
            r#"{"records": [{"record_type": "vehicle", "date": "2025-01-01T08:00:00", "vehicle": "V1", "address": "Depot", "latitude": 1.5, "longitude": 2.5}], "count": 1}"#,
        )
        .unwrap();

        let records = load_records_file(Path::new(&path)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, "V1");
        assert_eq!(records[0].address, "Depot");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_records_file_csv() {
        let path = temp_path("trip_report_test_records.csv");
        fs::write(
            &path,
            "identifier,kind,timestamp,address,latitude,longitude,source\n\
             A,ibutton,2025-01-01T08:00:00,Main St,37.9,23.7,Nikos\n\
             A,ibutton,2025-01-01T17:30:00,Depot,0,0,\n",
        )
        .unwrap();

        let records = load_records_file(Path::new(&path)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source.as_deref(), Some("Nikos"));
        assert_eq!(records[1].source, None);
        assert_eq!(records[1].timestamp.format("%H:%M").to_string(), "17:30");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_manual_trip_pads_seconds_and_defaults() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let trip = ManualTrip::new(IdentifierKind::Ibutton, "A", date, "09:15")
            .unwrap()
            .with_location(Some("  "), None, Some(23.7))
            .with_label("Driver");

        assert_eq!(trip.date, "2025-01-02T09:15:00");
        assert_eq!(trip.address, MANUAL_ENTRY);
        assert_eq!(trip.latitude, 0.0);
        assert_eq!(trip.longitude, 23.7);
        assert_eq!(trip.driver.as_deref(), Some("Driver"));
        assert_eq!(trip.vehicle, None);
    }

    #[test]
    fn test_manual_trip_rejects_bad_time() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert!(matches!(
            ManualTrip::new(IdentifierKind::Vehicle, "V1", date, "0915"),
            Err(ReportError::InvalidTime(_))
        ));
        assert!(matches!(
            ManualTrip::new(IdentifierKind::Vehicle, "V1", date, "25:00"),
            Err(ReportError::InvalidTime(_))
        ));
    }

    #[test]
    fn test_manual_trip_rejects_all_sentinel() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert!(matches!(
            ManualTrip::new(IdentifierKind::Ibutton, "All", date, "09:15"),
            Err(ReportError::MissingIdentifier)
        ));
    }

    #[test]
    fn test_manual_trip_vehicle_payload() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let trip = ManualTrip::new(IdentifierKind::Vehicle, "V1", date, "09:15:30")
            .unwrap()
            .with_label("Truck");
        let json = serde_json::to_value(&trip).unwrap();

        assert_eq!(json["record_type"], "vehicle");
        assert_eq!(json["vehicle"], "Truck");
        assert!(json.get("driver").is_none());
    }
}
