// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::application::forecast_service::ForecastService;
use crate::application::metrics::Metrics;
use crate::application::report_service::ReportService;
use crate::infrastructure::config::{load_database_config, load_service_config};
use crate::infrastructure::dwd_client::DwdClient;
use crate::infrastructure::pg_store::PgMeasurementStore;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    digest, health_check, ingest_measurement, metrics, summary_report, trigger_report,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let database_config = load_database_config()?;
    let service_config = load_service_config()?;

    // Create store (infrastructure layer)
    let store = Arc::new(PgMeasurementStore::connect(&database_config.database).await?);
    let process_metrics = Arc::new(Metrics::new());

    // Create services (application layer)
    let report_service = ReportService::new(
        store.clone(),
        process_metrics.clone(),
        service_config.report.tolerance_minutes,
        PathBuf::from(&service_config.report.output_path),
    );
    let forecast_service = ForecastService::new(
        store.clone(),
        DwdClient::new(service_config.forecast.station.clone()),
        process_metrics.clone(),
    );

    // Background collection and reporting loops
    spawn_forecast_loop(forecast_service, service_config.forecast.interval_minutes);
    spawn_report_loop(
        report_service.clone(),
        service_config.report.interval_minutes,
        service_config.report.merge_sources,
    );

    // Create application state
    let state = Arc::new(AppState {
        report_service,
        store: store.clone(),
        metrics: process_metrics,
        merge_sources: service_config.report.merge_sources,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics))
        .route("/reports/summary", get(summary_report))
        .route("/reports", post(trigger_report))
        .route("/reports/digest", get(digest))
        .route("/measurements", post(ingest_measurement))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = service_config.http.bind_addr.parse()?;
    println!("Starting home-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

fn spawn_forecast_loop(service: ForecastService, interval_minutes: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_minutes * 60));
        loop {
            ticker.tick().await;
            if let Err(err) = service.collect_once().await {
                tracing::error!(error = %err, "forecast collection failed");
            }
        }
    });
}

fn spawn_report_loop(service: ReportService, interval_minutes: u64, merge_sources: bool) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_minutes * 60));
        loop {
            ticker.tick().await;
            if let Err(err) = service.build_and_persist(merge_sources).await {
                tracing::error!(error = %err, "scheduled report failed");
            }
        }
    });
}
