//! Severity breakpoints and finding construction shared by all strategies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AnomalyFinding, FindingStatus, Metric, Severity, UnitProfile};

/// Per-metric thresholds, all expressed as deviation percentages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRules {
    /// Candidates below this deviation are treated as noise
    pub materiality_floor_percent: f64,
    /// Strictly above this is `High`
    pub high_above_percent: f64,
    /// Strictly above this is `Medium`
    pub medium_above_percent: f64,
}

impl MetricRules {
    pub const FLOW: MetricRules = MetricRules {
        materiality_floor_percent: 20.0,
        high_above_percent: 50.0,
        medium_above_percent: 30.0,
    };

    pub const TEMPERATURE: MetricRules = MetricRules {
        materiality_floor_percent: 15.0,
        high_above_percent: 40.0,
        medium_above_percent: 25.0,
    };

    pub fn is_material(&self, deviation_percent: f64) -> bool {
        deviation_percent >= self.materiality_floor_percent
    }

    pub fn classify(&self, deviation_percent: f64) -> Severity {
        if deviation_percent > self.high_above_percent {
            Severity::High
        } else if deviation_percent > self.medium_above_percent {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Metric-specific severity adjustment
///
/// Flow severity is never adjusted, so a high flow deviation stays high on
/// every unit class including UVC units. Under-temperature drops one level
/// relative to the same-magnitude over-temperature.
pub fn adjust_severity(metric: Metric, severity: Severity, observed: f64, expected: f64) -> Severity {
    match metric {
        Metric::Temperature if observed < expected => severity.downgrade(),
        Metric::Temperature | Metric::Flow => severity,
    }
}

/// `|observed - expected| / expected * 100`, `None` when expected is not positive
pub fn deviation_percent(observed: f64, expected: f64) -> Option<f64> {
    if !expected.is_finite() || expected <= f64::EPSILON {
        return None;
    }
    Some((observed - expected).abs() / expected * 100.0)
}

/// A scored deviation ready to be turned into a finding
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deviation {
    pub metric: Metric,
    pub measured_at: DateTime<Utc>,
    pub observed: f64,
    pub expected: f64,
    pub deviation_percent: f64,
    pub severity: Severity,
    pub confidence: f64,
}

impl Deviation {
    pub fn into_finding(self, unit: &UnitProfile, detected_at: DateTime<Utc>) -> AnomalyFinding {
        AnomalyFinding {
            id: Uuid::new_v4(),
            unit_id: unit.unit_id.clone(),
            unit_name: unit.unit_name.clone(),
            detected_at,
            measured_at: self.measured_at,
            metric: self.metric,
            severity: self.severity,
            observed_value: self.observed,
            expected_value: self.expected,
            deviation_percent: self.deviation_percent,
            confidence: self.confidence.clamp(0.0, 100.0),
            status: FindingStatus::New,
        }
    }
}
