//! Core data models for the fleet monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One reading reported by a purification unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub timestamp: DateTime<Utc>,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvc_hours: Option<f64>,
}

/// Ordering of a measurement sequence by timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first
    Ascending,
    /// Newest first
    Descending,
}

/// Measurements tagged with the order they are stored in
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSeries {
    order: SortOrder,
    measurements: Vec<Measurement>,
}

impl MeasurementSeries {
    /// Wrap measurements that the caller asserts are already in `order`
    pub fn new(order: SortOrder, measurements: Vec<Measurement>) -> Self {
        Self {
            order,
            measurements,
        }
    }

    /// Sort arbitrary measurements oldest-first
    pub fn from_unordered(mut measurements: Vec<Measurement>) -> Self {
        measurements.sort_by_key(|m| m.timestamp);
        Self::new(SortOrder::Ascending, measurements)
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn as_slice(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Normalize to oldest-first
    pub fn into_ascending(self) -> Self {
        match self.order {
            SortOrder::Ascending => self,
            SortOrder::Descending => {
                let mut measurements = self.measurements;
                measurements.reverse();
                // Stores may hand back partially ordered pages
                measurements.sort_by_key(|m| m.timestamp);
                Self::new(SortOrder::Ascending, measurements)
            }
        }
    }

    /// Oldest-first copy, leaving `self` untouched
    pub fn ascending(&self) -> MeasurementSeries {
        self.clone().into_ascending()
    }
}

/// Hardware class of a unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    #[default]
    Standard,
    Uvc,
}

/// Static wear counters and identity of a unit, as held by the unit registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitProfile {
    pub unit_id: String,
    pub unit_name: String,
    #[serde(default)]
    pub unit_type: UnitType,
    pub current_volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_uvc_hours: Option<f64>,
    pub setup_date: DateTime<Utc>,
}

/// Measured quantity an anomaly was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Flow,
    Temperature,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Flow => write!(f, "flow"),
            Metric::Temperature => write!(f, "temperature"),
        }
    }
}

/// Operational significance of an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// One level lower, saturating at `Low`
    pub fn downgrade(self) -> Self {
        match self {
            Severity::High => Severity::Medium,
            Severity::Medium | Severity::Low => Severity::Low,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Lifecycle state of a finding; later states belong to the alert sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    #[default]
    New,
}

/// A flagged deviation of one measurement from its expected value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFinding {
    pub id: Uuid,
    pub unit_id: String,
    pub unit_name: String,
    pub detected_at: DateTime<Utc>,
    pub measured_at: DateTime<Utc>,
    pub metric: Metric,
    pub severity: Severity,
    pub observed_value: f64,
    pub expected_value: f64,
    pub deviation_percent: f64,
    /// Heuristic score in [0, 100]
    pub confidence: f64,
    pub status: FindingStatus,
}

/// Kind of maintenance a prediction forecasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    FilterChange,
    UvcReplacement,
    GeneralService,
}

impl fmt::Display for MaintenanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintenanceType::FilterChange => write!(f, "filter_change"),
            MaintenanceType::UvcReplacement => write!(f, "uvc_replacement"),
            MaintenanceType::GeneralService => write!(f, "general_service"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// Forecast of when a wear counter crosses its replacement threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenancePrediction {
    pub id: Uuid,
    pub unit_id: String,
    pub unit_name: String,
    pub maintenance_type: MaintenanceType,
    pub predicted_date: DateTime<Utc>,
    pub estimated_days_remaining: i64,
    /// Fixed per-type constant in [0, 1]
    pub confidence: f64,
    pub priority: Priority,
}

/// Payload handed to the external alert sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub unit_id: String,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}
