// HTTP request handlers
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Json, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SummaryQuery {
    pub merge: Option<bool>,
}

#[derive(Deserialize)]
pub struct MeasurementBody {
    pub timestamp: DateTime<Utc>,
    pub humidity: f64,
    pub room_temp: f64,
    pub cpu_temp: f64,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Prometheus metrics exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render_prometheus(),
    )
}

/// Build a summary report from a fresh snapshot and return the SVG
pub async fn summary_report(
    Query(query): Query<SummaryQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let merge = query.merge.unwrap_or(state.merge_sources);
    match state.report_service.build_report(merge).await {
        Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "summary report failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "report generation failed").into_response()
        }
    }
}

/// Build a report and persist it to the configured output path
pub async fn trigger_report(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state
        .report_service
        .build_and_persist(state.merge_sources)
        .await
    {
        Ok(report) => match report.persisted_to {
            Some(path) => Json(json!({ "path": path.display().to_string() })).into_response(),
            None => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "report was not persisted",
            )
                .into_response(),
        },
        Err(e) => {
            tracing::error!(error = %e, "report generation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "report generation failed").into_response()
        }
    }
}

/// Plain-text statistics digest over all stored sources
pub async fn digest(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.report_service.digest().await {
        Ok(text) => text.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "digest build failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "digest build failed").into_response()
        }
    }
}

/// Ingest one sensor reading
pub async fn ingest_measurement(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MeasurementBody>,
) -> impl IntoResponse {
    match state
        .store
        .insert_measurement(body.timestamp, body.humidity, body.room_temp, body.cpu_temp)
        .await
    {
        Ok(()) => {
            state
                .metrics
                .measurement_ingested(body.room_temp, body.humidity);
            StatusCode::CREATED.into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "measurement insert failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_measurement_body_parses_rfc3339_timestamp() {
        let body: MeasurementBody = serde_json::from_str(
            r#"{"timestamp": "2024-03-10T12:30:00Z", "humidity": 48.0, "room_temp": 21.5, "cpu_temp": 55.0}"#,
        )
        .unwrap();
        assert_eq!(
            body.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 10, 12, 30, 0).unwrap()
        );
        assert_eq!(body.room_temp, 21.5);
    }
}
