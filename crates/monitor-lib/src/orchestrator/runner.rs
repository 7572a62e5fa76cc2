//! Per-unit processing and concurrent batch runs
//!
//! Each unit is fetched, normalized to oldest-first, analysed and persisted
//! independently. Writes for one unit are awaited one by one and a rejected
//! write never stops its siblings; a failed unit never stops the batch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result as AnyResult};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, Semaphore};
use tokio::time::{interval, Instant};
use tracing::{debug, info, warn};

use super::report::{BatchReport, UnitFailure, UnitReport};
use super::{AlertSink, MeasurementStore, PredictionStore, UnitRegistry};
use crate::anomaly::{Alerter, AnomalyStrategy};
use crate::error::{MonitorError, Result};
use crate::models::{MeasurementSeries, SortOrder};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::predictor::MaintenancePredictor;

/// Default number of measurements fetched per unit
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default interval between scheduled batch runs (15 minutes)
pub const DEFAULT_RUN_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Measurements fetched per unit ("last N")
    pub history_limit: usize,
    /// Deadline for one unit's full cycle; `None` waits indefinitely
    pub unit_timeout: Option<Duration>,
    /// Units processed at the same time
    pub max_concurrent_units: usize,
    /// Interval between scheduled runs
    pub run_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            unit_timeout: Some(Duration::from_secs(30)),
            max_concurrent_units: 16,
            run_interval: DEFAULT_RUN_INTERVAL,
        }
    }
}

/// Runs detection and prediction for units and persists the results
pub struct DetectionOrchestrator {
    measurements: Arc<dyn MeasurementStore>,
    units: Arc<dyn UnitRegistry>,
    alerts: Arc<dyn AlertSink>,
    predictions: Arc<dyn PredictionStore>,
    strategy: Arc<dyn AnomalyStrategy>,
    predictor: MaintenancePredictor,
    alerter: Alerter,
    config: OrchestratorConfig,
    permits: Arc<Semaphore>,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
    latest: watch::Sender<Option<Arc<BatchReport>>>,
}

impl DetectionOrchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Watch the most recent scheduled batch report
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<BatchReport>>> {
        self.latest.subscribe()
    }

    /// Fetch, analyse and persist a single unit
    ///
    /// Errors only when the unit profile or history cannot be read. Detector
    /// rejections and failed writes are recorded in the report instead.
    pub async fn process_unit(&self, unit_id: &str, as_of: DateTime<Utc>) -> Result<UnitReport> {
        let start = Instant::now();

        let unit = self.units.get_unit(unit_id).await.map_err(|e| {
            self.metrics.inc_fetch_failures();
            MonitorError::Fetch {
                unit_id: unit_id.to_string(),
                reason: format!("{:#}", e),
            }
        })?;

        let fetched = self
            .measurements
            .fetch_measurements(unit_id, SortOrder::Descending, self.config.history_limit)
            .await
            .map_err(|e| {
                self.metrics.inc_fetch_failures();
                MonitorError::Fetch {
                    unit_id: unit_id.to_string(),
                    reason: format!("{:#}", e),
                }
            })?;

        // Everything past this point sees oldest-first history
        let series = MeasurementSeries::new(SortOrder::Descending, fetched).into_ascending();
        let mut report = UnitReport::new(unit_id, self.strategy.name(), series.len());

        if series.len() < self.strategy.min_samples() {
            self.logger
                .log_insufficient_data(unit_id, self.strategy.min_samples(), series.len());
        }

        match self.strategy.detect(&unit, &series, as_of) {
            Ok(findings) => report.findings = findings,
            Err(e) if !e.is_fatal() => {
                debug!(unit_id = %unit_id, strategy = self.strategy.name(), reason = %e, "Detection skipped");
            }
            Err(e) => {
                warn!(unit_id = %unit_id, strategy = self.strategy.name(), error = %e, "Detection rejected input");
                report.detection_error = Some(e.to_string());
            }
        }
        report.predictions = self.predictor.predict(&unit, &series, as_of);

        self.metrics.add_anomalies_detected(report.findings.len());
        for finding in &report.findings {
            self.logger.log_anomaly(finding);
        }

        for alert in self.alerter.alerts_for(&report.findings, as_of) {
            match self.alerts.create_alert(alert).await {
                Ok(()) => {
                    report.alerts_created += 1;
                    self.metrics.inc_alerts_created();
                }
                Err(e) => {
                    report.alert_failures += 1;
                    self.record_write_failure(&mut report.errors, unit_id, "alert", &e);
                }
            }
        }

        for prediction in &report.predictions {
            self.logger.log_prediction(prediction);
            match self.predictions.save_prediction(prediction).await {
                Ok(()) => {
                    report.predictions_saved += 1;
                    self.metrics.inc_predictions_saved();
                }
                Err(e) => {
                    report.prediction_failures += 1;
                    self.record_write_failure(&mut report.errors, unit_id, "prediction", &e);
                }
            }
        }

        self.metrics.inc_units_processed();
        self.metrics.observe_unit_latency(start.elapsed().as_secs_f64());
        debug!(
            unit_id = %unit_id,
            findings = report.findings.len(),
            predictions = report.predictions.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Unit processed"
        );

        Ok(report)
    }

    fn record_write_failure(
        &self,
        errors: &mut Vec<String>,
        unit_id: &str,
        target: &'static str,
        cause: &anyhow::Error,
    ) {
        self.metrics.inc_persistence_failures();
        let error = MonitorError::Persistence {
            unit_id: unit_id.to_string(),
            target,
            reason: format!("{:#}", cause),
        };
        self.logger
            .log_persistence_failure(unit_id, target, &format!("{:#}", cause));
        errors.push(error.to_string());
    }

    /// `process_unit` under the configured deadline
    async fn process_unit_guarded(&self, unit_id: &str, as_of: DateTime<Utc>) -> Result<UnitReport> {
        match self.config.unit_timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.process_unit(unit_id, as_of))
                .await
                .map_err(|_| MonitorError::Timeout {
                    unit_id: unit_id.to_string(),
                })?,
            None => self.process_unit(unit_id, as_of).await,
        }
    }

    /// Process units concurrently; one unit's failure never affects another
    pub async fn run_batch(self: &Arc<Self>, unit_ids: Vec<String>, as_of: DateTime<Utc>) -> BatchReport {
        let start = Instant::now();
        let mut report = BatchReport::new(Utc::now());

        let handles: Vec<_> = unit_ids
            .into_iter()
            .map(|unit_id| {
                let this = Arc::clone(self);
                let task_unit = unit_id.clone();
                let handle = tokio::spawn(async move {
                    let _permit = this
                        .permits
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|_| MonitorError::invalid("concurrency limiter closed"))?;
                    this.process_unit_guarded(&task_unit, as_of).await
                });
                (unit_id, handle)
            })
            .collect();

        for (unit_id, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(join_error) => Err(format!("unit task aborted: {}", join_error)),
            };

            match outcome {
                Ok(unit_report) => report.units.push(unit_report),
                Err(error) => {
                    self.metrics.inc_units_failed();
                    self.logger.log_unit_failure(&unit_id, &error);
                    report.failures.push(UnitFailure { unit_id, error });
                }
            }
        }

        report.finished_at = Utc::now();
        self.logger.log_batch(
            report.total_units(),
            report.failures.len(),
            report.alerts_created(),
            report.predictions_saved(),
            start.elapsed().as_millis(),
        );
        report
    }

    /// List every registered unit and run one batch, publishing the report
    pub async fn run_once(self: &Arc<Self>) -> Result<Arc<BatchReport>> {
        let unit_ids = self
            .units
            .list_units()
            .await
            .map_err(|e| MonitorError::Registry(format!("{:#}", e)))?;

        let report = Arc::new(self.run_batch(unit_ids, Utc::now()).await);
        self.latest.send_replace(Some(Arc::clone(&report)));
        Ok(report)
    }

    /// Run batches on the configured interval until shutdown
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.run_interval.as_secs(),
            strategy = self.strategy.name(),
            min_alert_severity = %self.alerter.min_severity(),
            "Starting detection scheduler"
        );

        let mut ticker = interval(self.config.run_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        warn!(error = %e, "Scheduled batch skipped");
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down detection scheduler");
                    break;
                }
            }
        }
    }
}

/// Builder for `DetectionOrchestrator`
pub struct OrchestratorBuilder {
    measurements: Option<Arc<dyn MeasurementStore>>,
    units: Option<Arc<dyn UnitRegistry>>,
    alerts: Option<Arc<dyn AlertSink>>,
    predictions: Option<Arc<dyn PredictionStore>>,
    strategy: Option<Arc<dyn AnomalyStrategy>>,
    predictor: MaintenancePredictor,
    alerter: Alerter,
    config: OrchestratorConfig,
    instance: String,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            measurements: None,
            units: None,
            alerts: None,
            predictions: None,
            strategy: None,
            predictor: MaintenancePredictor::default(),
            alerter: Alerter::default(),
            config: OrchestratorConfig::default(),
            instance: "fleet-monitor".to_string(),
        }
    }

    /// Use one backend for all four store roles
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: MeasurementStore + UnitRegistry + AlertSink + PredictionStore + 'static,
    {
        self.measurement_store(store.clone())
            .unit_registry(store.clone())
            .alert_sink(store.clone())
            .prediction_store(store)
    }

    pub fn measurement_store(mut self, store: Arc<dyn MeasurementStore>) -> Self {
        self.measurements = Some(store);
        self
    }

    pub fn unit_registry(mut self, registry: Arc<dyn UnitRegistry>) -> Self {
        self.units = Some(registry);
        self
    }

    pub fn alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alerts = Some(sink);
        self
    }

    pub fn prediction_store(mut self, store: Arc<dyn PredictionStore>) -> Self {
        self.predictions = Some(store);
        self
    }

    pub fn strategy(mut self, strategy: Arc<dyn AnomalyStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn predictor(mut self, predictor: MaintenancePredictor) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn alerter(mut self, alerter: Alerter) -> Self {
        self.alerter = alerter;
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Name recorded on structured log events
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    pub fn build(self) -> AnyResult<DetectionOrchestrator> {
        let measurements = self
            .measurements
            .ok_or_else(|| anyhow!("Measurement store is required"))?;
        let units = self.units.ok_or_else(|| anyhow!("Unit registry is required"))?;
        let alerts = self.alerts.ok_or_else(|| anyhow!("Alert sink is required"))?;
        let predictions = self
            .predictions
            .ok_or_else(|| anyhow!("Prediction store is required"))?;
        // No default: choosing a detection strategy is an explicit decision
        let strategy = self
            .strategy
            .ok_or_else(|| anyhow!("Detection strategy is required"))?;

        let (latest, _) = watch::channel(None);

        Ok(DetectionOrchestrator {
            measurements,
            units,
            alerts,
            predictions,
            strategy,
            predictor: self.predictor,
            alerter: self.alerter,
            permits: Arc::new(Semaphore::new(self.config.max_concurrent_units.max(1))),
            config: self.config,
            metrics: MonitorMetrics::new(),
            logger: StructuredLogger::new(self.instance),
            latest,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
