//! CLI entry point for the trip report tool.
//!
//! Provides subcommands for listing tracked identifiers, building daily trip
//! reports from the tracking backend or a local export, adding manual trips,
//! and uploading raw CSV exports.

mod infra;
mod services;

use crate::infra::backend::BackendClient;
use crate::services::tracking_api::{RecordQuery, TrackingApi};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use trip_report::analyzers::{DateRange, ReportPeriod, group_display_name, resolve_display_name};
use trip_report::error::ReportError;
use trip_report::fetch::BasicClient;
use trip_report::fetch::auth::ApiKey;
use trip_report::output::{DocumentOptions, ExportFormat, RenderOptions, log_summary, render};
use trip_report::records::{IdentifierKind, ManualTrip, from_backend, load_records_file};
use trip_report::report::{ALL_IDENTIFIERS, ReportRequest};

#[derive(Parser)]
#[command(name = "trip_report")]
#[command(about = "Daily trip and work-hour reports from fleet tracking data", long_about = None)]
struct Cli {
    /// Base URL of the tracking backend
    #[arg(long, env = "TRACKING_API_URL", global = true)]
    api_url: Option<String>,

    /// Bearer token for the tracking backend
    #[arg(long, env = "TRACKING_API_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// TrueType font for PDF output, for names outside Latin-1
    #[arg(long, env = "REPORT_FONT_PATH", global = true)]
    font: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ExportArgs {
    /// Export format; without it the report is only logged
    #[arg(short, long, value_enum)]
    format: Option<ExportFormat>,

    /// Output file (default: Report_<identifier>_<start>_<end>.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Order days by date instead of the order they were first seen
    #[arg(long, default_value_t = false)]
    chronological: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List iButtons and vehicles known to the backend
    Identifiers,
    /// Build a report from backend records
    Report {
        /// iButton, vehicle, or "all" (default: first known identifier)
        #[arg(short, long)]
        identifier: Option<String>,

        #[arg(short, long, value_enum, default_value_t = IdentifierKind::Ibutton)]
        kind: IdentifierKind,

        /// First day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day, inclusive (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<NaiveDate>,

        #[command(flatten)]
        export: ExportArgs,
    },
    /// Build a report from a local JSON or CSV records file
    Render {
        /// Records file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long, default_value = ALL_IDENTIFIERS)]
        identifier: String,

        #[arg(short, long, value_enum, default_value_t = IdentifierKind::Ibutton)]
        kind: IdentifierKind,

        /// First day, inclusive (default: earliest record)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day, inclusive (default: latest record)
        #[arg(long)]
        end: Option<NaiveDate>,

        #[command(flatten)]
        export: ExportArgs,
    },
    /// Add a manually entered trip, then show the refreshed day
    AddTrip {
        #[arg(short, long)]
        identifier: String,

        #[arg(short, long, value_enum, default_value_t = IdentifierKind::Ibutton)]
        kind: IdentifierKind,

        /// Day of the trip (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Time of the trip (HH:MM or HH:MM:SS)
        #[arg(long)]
        time: String,

        #[arg(long)]
        address: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        latitude: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        longitude: Option<f64>,
    },
    /// Upload a raw iButton or vehicle CSV export to the backend
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/trip_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("trip_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let options = document_options(cli.font.as_deref())?;

    match cli.command {
        Commands::Identifiers => {
            let api = backend(&cli.api_url, &cli.token)?;
            let catalog = api.list_identifiers().await?;

            for id in &catalog.ibuttons {
                info!(kind = "ibutton", identifier = %id, "Identifier");
            }
            for id in &catalog.vehicles {
                info!(kind = "vehicle", identifier = %id, "Identifier");
            }
            info!(
                ibuttons = catalog.ibuttons.len(),
                vehicles = catalog.vehicles.len(),
                "Identifier list summary"
            );
        }
        Commands::Report {
            identifier,
            kind,
            start,
            end,
            export,
        } => {
            let api = backend(&cli.api_url, &cli.token)?;

            let (identifier, kind) = match identifier {
                Some(identifier) => (identifier, kind),
                None => {
                    let catalog = api.list_identifiers().await?;
                    let (kind, id) = catalog
                        .default_selection()
                        .ok_or(ReportError::MissingIdentifier)?;
                    info!(identifier = %id, kind = kind.as_str(), "No identifier given, using first known");
                    (id.to_string(), kind)
                }
            };

            let end = end.or_else(|| Some(Local::now().date_naive()));
            let request = ReportRequest::new(&identifier, kind, start, end);
            let periods = fetch_periods(&api, &request).await?;

            emit(&request, periods, &export, options)?;
        }
        Commands::Render {
            input,
            identifier,
            kind,
            start,
            end,
            export,
        } => {
            let mut records = load_records_file(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            let request = ReportRequest::new(&identifier, kind, start, end);
            if !request.is_all() {
                records.retain(|r| r.identifier == request.identifier);
            }

            let span = DateRange::spanning(&records);
            let request = ReportRequest {
                start: start.or(span.map(|s| s.start)),
                end: end.or(span.map(|s| s.end)),
                ..request
            };
            if request.start.is_none() {
                return Err(ReportError::NoData.into());
            }

            let periods = request.build_periods(&records)?;
            emit(&request, periods, &export, options)?;
        }
        Commands::AddTrip {
            identifier,
            kind,
            date,
            time,
            address,
            latitude,
            longitude,
        } => {
            let api = backend(&cli.api_url, &cli.token)?;
            let request = ReportRequest::new(&identifier, kind, Some(date), Some(date));

            let existing = from_backend(
                api.fetch_records(&record_query(&request)?).await?.records,
            );
            let label = resolve_display_name(&existing, kind);

            let trip = ManualTrip::new(kind, &identifier, date, &time)?
                .with_location(address.as_deref(), latitude, longitude)
                .with_label(&label);
            let message = api.add_manual_trip(&trip).await?;
            info!(identifier = %trip.identifier, date = %trip.date, "{message}");

            for period in fetch_periods(&api, &request).await? {
                log_summary(&period);
            }
        }
        Commands::Upload { file } => {
            let api = backend(&cli.api_url, &cli.token)?;
            let summary = api.upload_csv(&file).await?;

            info!(
                record_type = summary.record_type.map(|k| k.as_str()),
                records_count = summary.records_count,
                new_records = summary.new_records,
                duplicates_skipped = summary.duplicates_skipped,
                "Upload complete"
            );
            if summary.duplicates_skipped > 0 {
                info!("Duplicate records were detected and skipped");
            }
        }
    }

    Ok(())
}

/// Builds an authenticated backend client from the configured URL and token.
fn backend(
    api_url: &Option<String>,
    token: &Option<String>,
) -> Result<BackendClient<ApiKey<BasicClient>>> {
    let api_url = api_url
        .as_deref()
        .context("TRACKING_API_URL or --api-url must be set")?;
    let token = token
        .as_deref()
        .context("TRACKING_API_TOKEN or --token must be set")?;

    let http = ApiKey::bearer(BasicClient::new()?, token)?;
    BackendClient::new(api_url, http)
}

fn document_options(font: Option<&Path>) -> Result<DocumentOptions> {
    let font = match font {
        Some(path) => Some(
            std::fs::read(path).with_context(|| format!("Failed to read font {}", path.display()))?,
        ),
        None => None,
    };
    Ok(DocumentOptions { font })
}

fn record_query(request: &ReportRequest) -> Result<RecordQuery> {
    let (start_date, end_date) = request.query_bounds()?;
    Ok(RecordQuery {
        identifier: request.identifier.clone(),
        start_date,
        end_date,
        record_type: request.is_all().then_some(request.kind),
    })
}

/// Fetches the request's records and aggregates them into periods.
async fn fetch_periods(api: &impl TrackingApi, request: &ReportRequest) -> Result<Vec<ReportPeriod>> {
    let query = record_query(request)?;
    let response = api.fetch_records(&query).await?;

    if let Some(identifiers) = &response.identifiers {
        info!(
            count = response.count,
            identifiers = identifiers.len(),
            name = %group_display_name(request.kind, identifiers.len()),
            "Grouped records received"
        );
    }

    let records = from_backend(response.records);
    Ok(request.build_periods(&records)?)
}

/// Logs or exports the periods.
fn emit(
    request: &ReportRequest,
    periods: Vec<ReportPeriod>,
    export: &ExportArgs,
    document: DocumentOptions,
) -> Result<()> {
    let periods: Vec<ReportPeriod> = if export.chronological {
        periods.into_iter().map(ReportPeriod::chronological).collect()
    } else {
        periods
    };

    let Some(format) = export.format else {
        if periods.iter().all(ReportPeriod::is_empty) {
            warn!(identifier = %request.identifier, "No records found for the selected range");
        }
        for period in &periods {
            log_summary(period);
        }
        return Ok(());
    };

    let options = RenderOptions {
        document,
        all_identifiers: request.is_all(),
    };
    let bytes = render(format, &periods, &options)?;
    let path = export
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(request.export_file_name(format.extension())));
    std::fs::write(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), bytes = bytes.len(), format = format.extension(), "Report exported");
    Ok(())
}
