//! Detection orchestration against external stores
//!
//! The orchestrator is the only side-effecting component: it reads unit
//! profiles and measurement history, runs detection and prediction, and
//! writes alerts and predictions. Store access goes through the traits
//! below so any backend can be plugged in.

mod memory;
mod report;
mod runner;


pub use memory::{FleetSnapshot, InMemoryStore, UnitSnapshot};
pub use report::{BatchHealth, BatchReport, UnitFailure, UnitReport};
pub use runner::{DetectionOrchestrator, OrchestratorBuilder, OrchestratorConfig};

use anyhow::Result;

use crate::models::{AlertRecord, MaintenancePrediction, Measurement, SortOrder, UnitProfile};

pub use async_trait::async_trait;

/// Append-only per-unit measurement history
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Last `limit` measurements of a unit by timestamp, returned in `order`
    async fn fetch_measurements(
        &self,
        unit_id: &str,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<Measurement>>;
}

/// Unit administration data
#[async_trait]
pub trait UnitRegistry: Send + Sync {
    async fn get_unit(&self, unit_id: &str) -> Result<UnitProfile>;

    /// Identifiers of every unit that should be monitored
    async fn list_units(&self) -> Result<Vec<String>>;
}

/// Receiver of alert records; owns their lifecycle from here on
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn create_alert(&self, alert: AlertRecord) -> Result<()>;
}

/// Receiver of maintenance predictions
#[async_trait]
pub trait PredictionStore: Send + Sync {
    async fn save_prediction(&self, prediction: &MaintenancePrediction) -> Result<()>;
}
