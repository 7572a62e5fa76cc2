//! Purifier Monitor - scheduled fleet anomaly detection
//!
//! Loads a fleet snapshot, runs the configured detection strategy and the
//! maintenance predictor on an interval, and serves health, the latest
//! batch report and Prometheus metrics over HTTP.

use anyhow::Result;
use monitor_lib::{
    build_strategy, observability::StructuredLogger, DetectionOrchestrator, FleetSnapshot,
    InMemoryStore,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting purifier-monitor");

    let config = config::MonitorConfig::load()?;
    info!(
        instance = %config.instance_name,
        strategy = %config.strategy,
        snapshot = %config.snapshot_path,
        filter_volume_threshold = config.predictor.filter_volume_threshold,
        uvc_hours_threshold = config.predictor.uvc_hours_threshold,
        "Monitor configured"
    );

    let snapshot = FleetSnapshot::load(&config.snapshot_path)?;
    let store = Arc::new(InMemoryStore::from_snapshot(snapshot));
    info!(units = store.unit_count(), "Fleet snapshot loaded");

    let strategy = build_strategy(config.strategy, config.detection.clone(), config.raw.clone())?;

    let orchestrator = Arc::new(
        DetectionOrchestrator::builder()
            .store(store)
            .strategy(strategy)
            .predictor(config.predictor())
            .config(config.orchestrator_config())
            .instance(config.instance_name.clone())
            .build()?,
    );

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(MONITOR_VERSION, orchestrator.strategy_name());

    let app_state = Arc::new(api::AppState::new(orchestrator.subscribe()));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let (shutdown_tx, _) = broadcast::channel(1);
    let scheduler_handle = tokio::spawn(orchestrator.clone().run(shutdown_tx.subscribe()));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    let _ = scheduler_handle.await;
    api_handle.abort();

    info!("Shutdown complete");
    Ok(())
}
