//! Entry point for the measles case reconciliation run.
//!
//! Fetches the case, summary and weekly-series feeds once, runs the
//! reconciliation pipeline and writes the artifacts to the working
//! directory. The primary case feed is mandatory; the other two degrade to
//! empty outputs.

use anyhow::{Context, Result};
use chrono::Utc;
use measles_tracker::config::{ColumnVocabulary, FeedEndpoints};
use measles_tracker::fetch::{BasicClient, fetch_optional, fetch_source};
use measles_tracker::output::write_artifacts;
use measles_tracker::pipeline::{self, FeedSnapshot, RunContext};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/measles_tracker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("measles_tracker.log"));

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

    if let Err(e) = run().await {
        error!(error = ?e, "Run aborted");
        return Err(e);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let endpoints = FeedEndpoints::from_env();
    let vocabulary = ColumnVocabulary::from_env()?;
    let as_of = Utc::now().date_naive();
    let ctx = RunContext::new(as_of)?.with_vocabulary(vocabulary);

    info!(
        %as_of,
        cases = %endpoints.cases,
        summary = endpoints.summary.as_deref().unwrap_or("-"),
        weekly_series = endpoints.weekly_series.as_deref().unwrap_or("-"),
        "Starting run"
    );

    let client = BasicClient::new()?;

    let cases = fetch_source(&client, &endpoints.cases)
        .await
        .context("primary case feed is required")?;
    let summary = fetch_optional(&client, "summary", endpoints.summary.as_deref()).await;
    let weekly_series =
        fetch_optional(&client, "weekly_series", endpoints.weekly_series.as_deref()).await;

    let snapshot = FeedSnapshot {
        cases,
        summary,
        weekly_series,
    };

    let artifacts = pipeline::run(&snapshot, &ctx)?;
    write_artifacts(Path::new("."), &artifacts)?;

    info!(
        comparisons = artifacts.comparison.records.len(),
        weeks = artifacts.national.len(),
        "Finished"
    );
    Ok(())
}
