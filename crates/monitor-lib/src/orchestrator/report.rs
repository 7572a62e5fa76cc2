//! Per-unit and per-batch outcome reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AnomalyFinding, MaintenancePrediction};

/// Outcome of one unit's fetch/detect/predict/persist cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitReport {
    pub unit_id: String,
    pub strategy: String,
    pub measurements_analyzed: usize,
    pub findings: Vec<AnomalyFinding>,
    pub predictions: Vec<MaintenancePrediction>,
    pub alerts_created: usize,
    pub alert_failures: usize,
    pub predictions_saved: usize,
    pub prediction_failures: usize,
    /// Set when the detector rejected the input; predictions still ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_error: Option<String>,
    /// Persistence errors, one entry per rejected write
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl UnitReport {
    pub fn new(unit_id: impl Into<String>, strategy: impl Into<String>, measurements_analyzed: usize) -> Self {
        Self {
            unit_id: unit_id.into(),
            strategy: strategy.into(),
            measurements_analyzed,
            ..Default::default()
        }
    }

    /// True when any write or the detection step failed
    pub fn has_failures(&self) -> bool {
        self.alert_failures > 0 || self.prediction_failures > 0 || self.detection_error.is_some()
    }
}

/// A unit whose cycle aborted before producing a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitFailure {
    pub unit_id: String,
    pub error: String,
}

/// Overall state of a batch, used for health reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Outcome of processing a set of units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub units: Vec<UnitReport>,
    pub failures: Vec<UnitFailure>,
}

impl BatchReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            units: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn total_units(&self) -> usize {
        self.units.len() + self.failures.len()
    }

    pub fn alerts_created(&self) -> usize {
        self.units.iter().map(|u| u.alerts_created).sum()
    }

    pub fn predictions_saved(&self) -> usize {
        self.units.iter().map(|u| u.predictions_saved).sum()
    }

    pub fn findings(&self) -> impl Iterator<Item = &AnomalyFinding> {
        self.units.iter().flat_map(|u| u.findings.iter())
    }

    pub fn unit(&self, unit_id: &str) -> Option<&UnitReport> {
        self.units.iter().find(|u| u.unit_id == unit_id)
    }

    /// Unhealthy when every unit aborted, degraded on any partial failure
    pub fn health(&self) -> BatchHealth {
        if !self.failures.is_empty() && self.units.is_empty() {
            BatchHealth::Unhealthy
        } else if !self.failures.is_empty() || self.units.iter().any(UnitReport::has_failures) {
            BatchHealth::Degraded
        } else {
            BatchHealth::Healthy
        }
    }
}
