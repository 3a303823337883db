//! HTTP plumbing for talking to the tracking backend.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Executes `req` and decodes a JSON response body.
///
/// `action` names the operation for error messages, e.g. `"get records"`.
/// A non-success status becomes a single error carrying the backend's
/// `detail` message when it sent one.
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(
    client: &C,
    req: reqwest::Request,
    action: &str,
) -> Result<T> {
    let url = req.url().clone();
    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("Failed to {action}"))?;

    let status = resp.status();
    let body = resp.bytes().await?;
    debug!(%url, %status, bytes = body.len(), "Backend response");

    if !status.is_success() {
        return Err(anyhow!(error_message(action, status, &body)));
    }

    serde_json::from_slice(&body).with_context(|| format!("Failed to parse response to {action}"))
}

/// Human-readable message for a failed backend call.
pub fn error_message(action: &str, status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| format!("Failed to {action} (status {status})"))
}
