//! Observability infrastructure for the fleet monitor
//!
//! Provides:
//! - Prometheus metrics (detection latency, findings, alerts, predictions, store failures)
//! - Structured JSON logging with tracing

use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::models::{AnomalyFinding, MaintenancePrediction, Severity};

/// Histogram buckets for per-unit processing latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    unit_latency_seconds: Histogram,
    units_processed: IntCounter,
    units_failed: IntCounter,
    anomalies_detected: IntCounter,
    alerts_created: IntCounter,
    predictions_saved: IntCounter,
    persistence_failures: IntCounter,
    fetch_failures: IntCounter,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            unit_latency_seconds: register_histogram!(
                "fleet_monitor_unit_latency_seconds",
                "Time spent fetching, analysing and persisting one unit",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register unit_latency_seconds"),

            units_processed: register_int_counter!(
                "fleet_monitor_units_processed_total",
                "Units whose fetch/detect/predict cycle completed"
            )
            .expect("Failed to register units_processed"),

            units_failed: register_int_counter!(
                "fleet_monitor_units_failed_total",
                "Units whose cycle aborted (fetch failure, timeout)"
            )
            .expect("Failed to register units_failed"),

            anomalies_detected: register_int_counter!(
                "fleet_monitor_anomalies_detected_total",
                "Anomaly findings produced"
            )
            .expect("Failed to register anomalies_detected"),

            alerts_created: register_int_counter!(
                "fleet_monitor_alerts_created_total",
                "Alerts accepted by the alert sink"
            )
            .expect("Failed to register alerts_created"),

            predictions_saved: register_int_counter!(
                "fleet_monitor_predictions_saved_total",
                "Maintenance predictions accepted by the predictions store"
            )
            .expect("Failed to register predictions_saved"),

            persistence_failures: register_int_counter!(
                "fleet_monitor_persistence_failures_total",
                "Alert or prediction writes rejected by a store"
            )
            .expect("Failed to register persistence_failures"),

            fetch_failures: register_int_counter!(
                "fleet_monitor_fetch_failures_total",
                "Unit profile or measurement reads that failed"
            )
            .expect("Failed to register fetch_failures"),
        }
    }
}

/// Lightweight handle to the global metrics instance
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    pub fn observe_unit_latency(&self, duration_secs: f64) {
        self.inner().unit_latency_seconds.observe(duration_secs);
    }

    pub fn inc_units_processed(&self) {
        self.inner().units_processed.inc();
    }

    pub fn inc_units_failed(&self) {
        self.inner().units_failed.inc();
    }

    pub fn add_anomalies_detected(&self, count: usize) {
        self.inner().anomalies_detected.inc_by(count as u64);
    }

    pub fn inc_alerts_created(&self) {
        self.inner().alerts_created.inc();
    }

    pub fn inc_predictions_saved(&self) {
        self.inner().predictions_saved.inc();
    }

    pub fn inc_persistence_failures(&self) {
        self.inner().persistence_failures.inc();
    }

    pub fn inc_fetch_failures(&self) {
        self.inner().fetch_failures.inc();
    }
}

/// Structured logger for monitor events
///
/// Provides consistent event-style records for findings, predictions and
/// store failures.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Log an anomaly finding; high severity goes out at warn level
    pub fn log_anomaly(&self, finding: &AnomalyFinding) {
        match finding.severity {
            Severity::High => {
                warn!(
                    event = "anomaly_detected",
                    instance = %self.instance,
                    unit_id = %finding.unit_id,
                    metric = %finding.metric,
                    severity = %finding.severity,
                    observed = finding.observed_value,
                    expected = finding.expected_value,
                    deviation_percent = finding.deviation_percent,
                    confidence = finding.confidence,
                    "High severity anomaly detected"
                );
            }
            _ => {
                info!(
                    event = "anomaly_detected",
                    instance = %self.instance,
                    unit_id = %finding.unit_id,
                    metric = %finding.metric,
                    severity = %finding.severity,
                    observed = finding.observed_value,
                    expected = finding.expected_value,
                    deviation_percent = finding.deviation_percent,
                    confidence = finding.confidence,
                    "Anomaly detected"
                );
            }
        }
    }

    pub fn log_prediction(&self, prediction: &MaintenancePrediction) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            unit_id = %prediction.unit_id,
            maintenance_type = %prediction.maintenance_type,
            days_remaining = prediction.estimated_days_remaining,
            priority = %prediction.priority,
            predicted_date = %prediction.predicted_date.to_rfc3339(),
            "Generated maintenance prediction"
        );
    }

    pub fn log_persistence_failure(&self, unit_id: &str, target: &str, error: &str) {
        warn!(
            event = "persistence_failed",
            instance = %self.instance,
            unit_id = %unit_id,
            target = %target,
            error = %error,
            "Store rejected write, continuing with remaining results"
        );
    }

    pub fn log_insufficient_data(&self, unit_id: &str, required: usize, available: usize) {
        debug!(
            event = "insufficient_data",
            instance = %self.instance,
            unit_id = %unit_id,
            required = required,
            available = available,
            "Not enough history for statistical detection"
        );
    }

    pub fn log_unit_failure(&self, unit_id: &str, error: &str) {
        warn!(
            event = "unit_failed",
            instance = %self.instance,
            unit_id = %unit_id,
            error = %error,
            "Unit processing aborted"
        );
    }

    pub fn log_batch(&self, units: usize, failed: usize, alerts: usize, predictions: usize, elapsed_ms: u128) {
        info!(
            event = "batch_completed",
            instance = %self.instance,
            units = units,
            failed_units = failed,
            alerts_created = alerts,
            predictions_saved = predictions,
            elapsed_ms = elapsed_ms,
            "Detection batch complete"
        );
    }

    pub fn log_startup(&self, version: &str, strategy: &str) {
        info!(
            event = "monitor_started",
            instance = %self.instance,
            version = %version,
            strategy = %strategy,
            "Fleet monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Fleet monitor shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_metrics_handles_share_registry() {
        let a = MonitorMetrics::new();
        let b = a.clone();

        a.observe_unit_latency(0.002);
        a.inc_units_processed();
        b.add_anomalies_detected(3);
        b.inc_alerts_created();
        b.inc_predictions_saved();
        b.inc_persistence_failures();
        b.inc_fetch_failures();
        b.inc_units_failed();

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "fleet_monitor_anomalies_detected_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("monitor-test");
        assert_eq!(logger.instance(), "monitor-test");
    }
}
