//! Raw-value deviation detection
//!
//! Works directly on unsmoothed readings. A reading is flagged when it is a
//! z-score outlier across the whole retained history, or when it departs
//! from the mean of the readings just before it by more than a fixed
//! percentage. Temperatures outside an absolute operating band are flagged
//! regardless of history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rules::{adjust_severity, deviation_percent, Deviation, MetricRules};
use super::{metric_samples, AnomalyStrategy, MetricSamples};
use crate::error::{MonitorError, Result};
use crate::models::{AnomalyFinding, MeasurementSeries, Metric, Severity, UnitProfile};
use crate::stats::{self, ensure_finite};

/// Thresholds for raw deviation detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDeviationConfig {
    /// Standard deviations from the history mean that count as an outlier
    pub z_score_threshold: f64,
    /// Preceding readings averaged for the short-term comparison
    pub recent_window: usize,
    /// Allowed departure from the short-term mean, in percent
    pub recent_deviation_percent: f64,
    /// Lowest acceptable water temperature (°C)
    pub temperature_min: f64,
    /// Highest acceptable water temperature (°C)
    pub temperature_max: f64,
    pub flow: MetricRules,
    pub temperature: MetricRules,
}

impl Default for RawDeviationConfig {
    fn default() -> Self {
        Self {
            z_score_threshold: 3.0,
            recent_window: 5,
            recent_deviation_percent: 40.0,
            temperature_min: 5.0,
            temperature_max: 35.0,
            flow: MetricRules::FLOW,
            temperature: MetricRules::TEMPERATURE,
        }
    }
}

impl RawDeviationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.z_score_threshold > 0.0 && self.z_score_threshold.is_finite()) {
            return Err(MonitorError::invalid(format!(
                "z_score_threshold must be positive, got {}",
                self.z_score_threshold
            )));
        }
        if self.recent_window == 0 {
            return Err(MonitorError::invalid("recent_window must be at least 1"));
        }
        if !(self.recent_deviation_percent > 0.0) {
            return Err(MonitorError::invalid(format!(
                "recent_deviation_percent must be positive, got {}",
                self.recent_deviation_percent
            )));
        }
        if !(self.temperature_min < self.temperature_max) {
            return Err(MonitorError::invalid(format!(
                "temperature band is empty: [{}, {}]",
                self.temperature_min, self.temperature_max
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

/// Detector operating on raw readings
#[derive(Debug, Clone, Default)]
pub struct RawDeviationStrategy {
    config: RawDeviationConfig,
}

impl RawDeviationStrategy {
    pub fn new(config: RawDeviationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RawDeviationConfig {
        &self.config
    }

    /// Statistical outlier test for one reading, returning the expected value if flagged
    fn outlier_baseline(&self, values: &[f64], i: usize, history_mean: f64, history_sd: f64) -> Option<f64> {
        let value = values[i];
        let window = self.config.recent_window;

        let z_outlier = history_sd > f64::EPSILON
            && (value - history_mean).abs() > self.config.z_score_threshold * history_sd;

        let recent_mean = (i >= window).then(|| stats::mean(&values[i - window..i]));
        let recent_outlier = recent_mean
            .and_then(|m| deviation_percent(value, m))
            .map(|p| p > self.config.recent_deviation_percent)
            .unwrap_or(false);

        if z_outlier || recent_outlier {
            Some(recent_mean.unwrap_or(history_mean))
        } else {
            None
        }
    }

    fn detect_statistical(&self, metric: Metric, samples: &MetricSamples, skip: &[bool]) -> Vec<Deviation> {
        let values = &samples.values;
        if values.len() < self.min_samples() {
            return Vec::new();
        }

        let rules = self.config.rules(metric);
        let history_mean = stats::mean(values);
        let history_sd = stats::standard_deviation(values);

        let mut deviations = Vec::new();
        for i in 0..values.len() {
            if skip.get(i).copied().unwrap_or(false) {
                continue;
            }
            let Some(expected) = self.outlier_baseline(values, i, history_mean, history_sd) else {
                continue;
            };
            let observed = values[i];
            let Some(percent) = deviation_percent(observed, expected) else {
                continue;
            };
            if !rules.is_material(percent) {
                continue;
            }

            deviations.push(Deviation {
                metric,
                measured_at: samples.timestamps[i],
                observed,
                expected,
                deviation_percent: percent,
                severity: adjust_severity(metric, rules.classify(percent), observed, expected),
                confidence: stats::confidence_level(percent / 100.0, values.len()),
            });
        }
        deviations
    }

    /// Absolute band check; returns one slot per sample marking violations
    fn detect_band(&self, samples: &MetricSamples, out: &mut Vec<Deviation>) -> Vec<bool> {
        let (min, max) = (self.config.temperature_min, self.config.temperature_max);
        let mut flagged = vec![false; samples.values.len()];

        for (i, &observed) in samples.values.iter().enumerate() {
            let edge = if observed > max {
                max
            } else if observed < min {
                min
            } else {
                continue;
            };
            flagged[i] = true;

            let percent = if edge.abs() > f64::EPSILON {
                (observed - edge).abs() / edge.abs() * 100.0
            } else {
                (observed - edge).abs() * 100.0
            };
            out.push(Deviation {
                metric: Metric::Temperature,
                measured_at: samples.timestamps[i],
                observed,
                expected: edge,
                deviation_percent: percent,
                severity: adjust_severity(Metric::Temperature, Severity::High, observed, edge),
                confidence: 100.0,
            });
        }
        flagged
    }
}

impl AnomalyStrategy for RawDeviationStrategy {
    fn name(&self) -> &'static str {
        "raw_deviation"
    }

    fn min_samples(&self) -> usize {
        self.config.recent_window + 1
    }

    fn detect(
        &self,
        unit: &UnitProfile,
        series: &MeasurementSeries,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AnomalyFinding>> {
        self.config.validate()?;

        let series = series.ascending();
        let flow = metric_samples(series.as_slice(), Metric::Flow);
        let temperature = metric_samples(series.as_slice(), Metric::Temperature);
        ensure_finite(&flow.values, "flow values")?;
        ensure_finite(&temperature.values, "temperature values")?;

        if series.len() < self.min_samples() {
            let reason = MonitorError::InsufficientData {
                required: self.min_samples(),
                available: series.len(),
            };
            debug!(unit_id = %unit.unit_id, strategy = self.name(), reason = %reason, "Statistical detection skipped");
        }

        let mut deviations = self.detect_statistical(Metric::Flow, &flow, &[]);
        let out_of_band = self.detect_band(&temperature, &mut deviations);
        deviations.extend(self.detect_statistical(Metric::Temperature, &temperature, &out_of_band));

        deviations.sort_by_key(|d| d.measured_at);
        Ok(deviations
            .into_iter()
            .map(|d| d.into_finding(unit, as_of))
            .collect())
    }
}
