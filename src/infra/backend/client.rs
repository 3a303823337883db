use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};
use trip_report::fetch::{HttpClient, fetch_json};
use trip_report::records::ManualTrip;

use crate::services::tracking_api::{
    IdentifierCatalog, RecordQuery, RecordsResponse, TrackingApi, UploadSummary,
};

#[derive(Deserialize)]
struct MessageResponse {
    message: String,
}

/// Client for the tracking backend's REST API, mounted under `/api`.
pub struct BackendClient<C> {
    base_url: Url,
    http: C,
    // Only assembles requests (query strings, multipart bodies); `http`
    // sends them.
    requests: reqwest::Client,
}

impl<C: HttpClient> BackendClient<C> {
    pub fn new(base_url: &str, http: C) -> Result<Self> {
        let base_url = format!("{}/api/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&base_url).with_context(|| format!("Invalid backend URL '{base_url}'"))?;

        Ok(Self {
            base_url,
            http,
            requests: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl<C: HttpClient> TrackingApi for BackendClient<C> {
    #[tracing::instrument(skip(self))]
    async fn list_identifiers(&self) -> Result<IdentifierCatalog> {
        let req = self
            .requests
            .get(self.endpoint("tracking/identifiers")?)
            .build()?;
        let catalog: IdentifierCatalog = fetch_json(&self.http, req, "get identifiers").await?;

        debug!(
            ibuttons = catalog.ibuttons.len(),
            vehicles = catalog.vehicles.len(),
            "Identifier catalog fetched"
        );
        Ok(catalog)
    }

    #[tracing::instrument(skip(self, query), fields(identifier = %query.identifier))]
    async fn fetch_records(&self, query: &RecordQuery) -> Result<RecordsResponse> {
        let req = self
            .requests
            .get(self.endpoint("tracking/records")?)
            .query(&query.params())
            .build()?;
        let response: RecordsResponse = fetch_json(&self.http, req, "get records").await?;

        info!(count = response.records.len(), "Records fetched");
        Ok(response)
    }

    #[tracing::instrument(skip(self, trip), fields(identifier = %trip.identifier, date = %trip.date))]
    async fn add_manual_trip(&self, trip: &ManualTrip) -> Result<String> {
        let req = self
            .requests
            .post(self.endpoint("tracking/add-manual")?)
            .json(trip)
            .build()?;
        let response: MessageResponse = fetch_json(&self.http, req, "add trip").await?;
        Ok(response.message)
    }

    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    async fn upload_csv(&self, path: &Path) -> Result<UploadSummary> {
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv {
            bail!("Only CSV files are supported");
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let part = Part::bytes(bytes).file_name(file_name).mime_str("text/csv")?;
        let req = self
            .requests
            .post(self.endpoint("tracking/upload")?)
            .multipart(Form::new().part("file", part))
            .build()?;

        fetch_json(&self.http, req, "upload").await
    }
}
