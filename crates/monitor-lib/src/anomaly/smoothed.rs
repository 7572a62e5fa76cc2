//! Smoothed moving-average deviation detection
//!
//! Each metric is exponentially smoothed, a trailing moving average of the
//! smoothed series forms the expected baseline, and points whose distance
//! from that baseline exceeds a multiple of the smoothed series' standard
//! deviation become candidates. Candidates are then filtered by a
//! per-metric materiality floor and classified by deviation percentage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rules::{adjust_severity, deviation_percent, Deviation, MetricRules};
use super::{metric_samples, AnomalyStrategy, MetricSamples};
use crate::error::{MonitorError, Result};
use crate::models::{AnomalyFinding, MeasurementSeries, Metric, UnitProfile};
use crate::stats::{self, ensure_finite};

/// Sensitivity settings for smoothed detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Trailing points averaged to form the baseline (>= 2)
    pub moving_average_window: usize,
    /// Exponential smoothing alpha in (0, 1]
    pub smoothing_factor: f64,
    /// Multiple of the smoothed series' standard deviation (> 0)
    pub standard_deviation_threshold: f64,
    pub flow: MetricRules,
    pub temperature: MetricRules,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            moving_average_window: 5,
            smoothing_factor: 0.3,
            standard_deviation_threshold: 3.0,
            flow: MetricRules::FLOW,
            temperature: MetricRules::TEMPERATURE,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.moving_average_window < 2 {
            return Err(MonitorError::invalid(format!(
                "moving_average_window must be at least 2, got {}",
                self.moving_average_window
            )));
        }
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(MonitorError::invalid(format!(
                "smoothing_factor must be in (0, 1], got {}",
                self.smoothing_factor
            )));
        }
        if !(self.standard_deviation_threshold > 0.0 && self.standard_deviation_threshold.is_finite())
        {
            return Err(MonitorError::invalid(format!(
                "standard_deviation_threshold must be positive, got {}",
                self.standard_deviation_threshold
            )));
        }
        Ok(())
    }

    fn rules(&self, metric: Metric) -> &MetricRules {
        match metric {
            Metric::Flow => &self.flow,
            Metric::Temperature => &self.temperature,
        }
    }
}

/// Detector built on exponential smoothing plus a moving-average baseline
#[derive(Debug, Clone, Default)]
pub struct SmoothedDeviationStrategy {
    config: DetectionConfig,
}

impl SmoothedDeviationStrategy {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    fn detect_metric(&self, metric: Metric, samples: &MetricSamples) -> Vec<Deviation> {
        let window = self.config.moving_average_window;
        let rules = self.config.rules(metric);

        let smoothed = stats::exponential_smoothing(&samples.values, self.config.smoothing_factor);
        let baseline = stats::moving_average(&smoothed, window);
        let limit = self.config.standard_deviation_threshold * stats::standard_deviation(&smoothed);

        let mut deviations = Vec::new();
        for (i, (&observed, &expected)) in smoothed.iter().zip(&baseline).enumerate() {
            if (observed - expected).abs() <= limit {
                continue;
            }
            let Some(percent) = deviation_percent(observed, expected) else {
                continue;
            };
            if !rules.is_material(percent) {
                continue;
            }

            let severity = adjust_severity(metric, rules.classify(percent), observed, expected);
            deviations.push(Deviation {
                metric,
                measured_at: samples.timestamps[i],
                observed,
                expected,
                deviation_percent: percent,
                severity,
                confidence: stats::confidence_level(percent / 100.0, window),
            });
        }
        deviations
    }
}

impl AnomalyStrategy for SmoothedDeviationStrategy {
    fn name(&self) -> &'static str {
        "smoothed"
    }

    fn min_samples(&self) -> usize {
        self.config.moving_average_window
    }

    fn detect(
        &self,
        unit: &UnitProfile,
        series: &MeasurementSeries,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AnomalyFinding>> {
        self.config.validate()?;

        let series = series.ascending();
        let window = self.config.moving_average_window;

        if series.len() < window {
            let reason = MonitorError::InsufficientData {
                required: window,
                available: series.len(),
            };
            debug!(unit_id = %unit.unit_id, strategy = self.name(), reason = %reason, "Skipping detection");
            return Ok(Vec::new());
        }

        let mut deviations = Vec::new();

        let flow = metric_samples(series.as_slice(), Metric::Flow);
        ensure_finite(&flow.values, "flow values")?;
        deviations.extend(self.detect_metric(Metric::Flow, &flow));

        let temperature = metric_samples(series.as_slice(), Metric::Temperature);
        ensure_finite(&temperature.values, "temperature values")?;
        if temperature.values.len() >= window {
            deviations.extend(self.detect_metric(Metric::Temperature, &temperature));
        }

        deviations.sort_by_key(|d| d.measured_at);
        Ok(deviations
            .into_iter()
            .map(|d| d.into_finding(unit, as_of))
            .collect())
    }
}
