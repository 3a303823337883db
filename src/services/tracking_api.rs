//! Trait and types for interacting with the tracking backend.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use trip_report::records::{BackendRecord, IdentifierKind, ManualTrip};

/// Distinct identifiers known to the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentifierCatalog {
    #[serde(default)]
    pub ibuttons: Vec<String>,
    #[serde(default)]
    pub vehicles: Vec<String>,
}

impl IdentifierCatalog {
    /// The identifier selected when none is given: the first iButton, else
    /// the first vehicle.
    pub fn default_selection(&self) -> Option<(IdentifierKind, &str)> {
        self.ibuttons
            .first()
            .map(|id| (IdentifierKind::Ibutton, id.as_str()))
            .or_else(|| {
                self.vehicles
                    .first()
                    .map(|id| (IdentifierKind::Vehicle, id.as_str()))
            })
    }
}

/// Filter for the record-query endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub identifier: String,
    pub start_date: String,
    pub end_date: String,
    pub record_type: Option<IdentifierKind>,
}

impl RecordQuery {
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![
            ("identifier", self.identifier.as_str()),
            ("start_date", self.start_date.as_str()),
            ("end_date", self.end_date.as_str()),
        ];
        if let Some(kind) = &self.record_type {
            params.push(("record_type", kind.as_str()));
        }
        params
    }
}

/// Response of the record-query endpoint.
///
/// In `all` mode the backend also sends its own grouping; records are
/// regrouped locally instead, so only the identifier list is kept.
#[derive(Debug, Deserialize)]
pub struct RecordsResponse {
    pub records: Vec<BackendRecord>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub identifiers: Option<Vec<String>>,
}

/// Outcome of a CSV upload.
#[derive(Debug, Deserialize)]
pub struct UploadSummary {
    #[serde(default)]
    pub record_type: Option<IdentifierKind>,
    pub records_count: usize,
    pub new_records: usize,
    #[serde(default)]
    pub duplicates_skipped: usize,
}

/// Abstraction over the tracking backend's record endpoints.
#[async_trait::async_trait]
pub trait TrackingApi {
    /// Returns the distinct iButtons and vehicles.
    async fn list_identifiers(&self) -> Result<IdentifierCatalog>;

    /// Returns records matching `query`.
    async fn fetch_records(&self, query: &RecordQuery) -> Result<RecordsResponse>;

    /// Stores a manually entered trip and returns the backend's message.
    async fn add_manual_trip(&self, trip: &ManualTrip) -> Result<String>;

    /// Uploads a raw iButton or vehicle CSV export.
    async fn upload_csv(&self, path: &Path) -> Result<UploadSummary>;
}
