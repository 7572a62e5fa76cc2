//! Alert construction for anomaly findings
//!
//! Only findings at or above the alerting severity (default `High`) become
//! alert records, which bounds the volume sent to the alert sink.

use chrono::{DateTime, Utc};

use crate::models::{AlertRecord, AnomalyFinding, Metric, Severity};

/// Turns findings into alert sink payloads
#[derive(Debug, Clone)]
pub struct Alerter {
    min_severity: Severity,
}

impl Alerter {
    /// Alert on high-severity findings only
    pub fn new() -> Self {
        Self {
            min_severity: Severity::High,
        }
    }

    /// Set a custom alerting severity
    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    pub fn should_alert(&self, finding: &AnomalyFinding) -> bool {
        finding.severity >= self.min_severity
    }

    /// Build the alert record for a single finding
    pub fn create_alert(&self, finding: &AnomalyFinding, created_at: DateTime<Utc>) -> AlertRecord {
        let (label, unit) = match finding.metric {
            Metric::Flow => ("Flow", ""),
            Metric::Temperature => ("Temperature", " °C"),
        };
        let direction = if finding.observed_value >= finding.expected_value {
            "above"
        } else {
            "below"
        };

        let message = format!(
            "{} anomaly on {}: {:.1}{} observed, {:.0}% {} expected {:.1}{} (confidence {:.0}%)",
            label,
            finding.unit_name,
            finding.observed_value,
            unit,
            finding.deviation_percent,
            direction,
            finding.expected_value,
            unit,
            finding.confidence,
        );

        AlertRecord {
            unit_id: finding.unit_id.clone(),
            message,
            severity: finding.severity,
            created_at,
        }
    }

    /// One alert per finding that clears the alerting severity
    pub fn alerts_for(&self, findings: &[AnomalyFinding], created_at: DateTime<Utc>) -> Vec<AlertRecord> {
        findings
            .iter()
            .filter(|f| self.should_alert(f))
            .map(|f| self.create_alert(f, created_at))
            .collect()
    }
}

impl Default for Alerter {
    fn default() -> Self {
        Self::new()
    }
}
