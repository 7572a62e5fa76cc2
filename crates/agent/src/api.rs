//! HTTP API for health checks, the latest batch report and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use monitor_lib::{BatchHealth, BatchReport, MonitorMetrics};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub latest: watch::Receiver<Option<Arc<BatchReport>>>,
}

impl AppState {
    pub fn new(latest: watch::Receiver<Option<Arc<BatchReport>>>) -> Self {
        // Register the monitor's collectors before the first scrape
        MonitorMetrics::new();
        Self { latest }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy`, `degraded`, `unhealthy`, or `pending` before the first run
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    pub units: usize,
    pub failed_units: usize,
}

/// Health check response - returns 200 if healthy/degraded, 503 otherwise
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let latest = state.latest.borrow().clone();

    let Some(report) = latest else {
        let pending = HealthResponse {
            status: "pending".to_string(),
            last_run: None,
            units: 0,
            failed_units: 0,
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(pending));
    };

    let health = report.health();
    let status_code = match health {
        BatchHealth::Healthy => StatusCode::OK,
        BatchHealth::Degraded => StatusCode::OK, // Still operational
        BatchHealth::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    let body = HealthResponse {
        status: match health {
            BatchHealth::Healthy => "healthy",
            BatchHealth::Degraded => "degraded",
            BatchHealth::Unhealthy => "unhealthy",
        }
        .to_string(),
        last_run: Some(report.finished_at),
        units: report.total_units(),
        failed_units: report.failures.len(),
    };

    (status_code, Json(body))
}

/// Most recent batch report, 404 until the first run completes
async fn report(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let latest = state.latest.borrow().clone();
    match latest {
        Some(report) => (StatusCode::OK, Json(serde_json::to_value(&*report).unwrap_or_default())),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no batch has completed yet" })),
        ),
    }
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/report", get(report))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
