//! Monitoring library for water-purification units
//!
//! This crate provides the core functionality for:
//! - Anomaly detection on flow and temperature measurements
//! - Maintenance prediction from wear counters and usage rates
//! - Orchestrated per-unit processing against pluggable stores
//! - Metrics and structured logging

pub mod anomaly;
pub mod error;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod predictor;
pub mod stats;

pub use anomaly::{build_strategy, AnomalyStrategy, DetectionConfig, DetectionStrategy, RawDeviationConfig};
pub use error::{MonitorError, Result};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
pub use orchestrator::{
    BatchHealth, BatchReport, DetectionOrchestrator, FleetSnapshot, InMemoryStore, OrchestratorConfig,
};
pub use predictor::{MaintenancePredictor, PredictorConfig};
