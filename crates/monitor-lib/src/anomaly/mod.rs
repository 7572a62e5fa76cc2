//! Anomaly detection for unit measurement streams
//!
//! This module provides two detection strategies behind one trait:
//! - Smoothed moving-average deviation (`smoothed`)
//! - Raw z-score / recent-mean deviation with an absolute temperature band (`raw_deviation`)
//!
//! plus the alert records produced for high-severity findings.

mod alert;
mod raw;
mod rules;
mod smoothed;

pub use alert::Alerter;
pub use raw::{RawDeviationConfig, RawDeviationStrategy};
pub use rules::{adjust_severity, deviation_percent, MetricRules};
pub use smoothed::{DetectionConfig, SmoothedDeviationStrategy};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::models::{AnomalyFinding, Measurement, MeasurementSeries, Metric, UnitProfile};

/// Trait for anomaly detection implementations
pub trait AnomalyStrategy: Send + Sync {
    /// Stable identifier used in configuration and logs
    fn name(&self) -> &'static str;

    /// Measurements needed before statistical detection runs
    fn min_samples(&self) -> usize;

    /// Detect anomalies in one unit's history
    ///
    /// Any ordering is accepted; implementations normalize to oldest-first.
    /// Too little history yields an empty list, never an error.
    fn detect(
        &self,
        unit: &UnitProfile,
        series: &MeasurementSeries,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AnomalyFinding>>;
}

/// Selectable detection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    Smoothed,
    #[serde(alias = "raw-deviation", alias = "raw")]
    RawDeviation,
}

impl fmt::Display for DetectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionStrategy::Smoothed => write!(f, "smoothed"),
            DetectionStrategy::RawDeviation => write!(f, "raw_deviation"),
        }
    }
}

impl FromStr for DetectionStrategy {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "smoothed" => Ok(DetectionStrategy::Smoothed),
            "raw_deviation" | "raw" => Ok(DetectionStrategy::RawDeviation),
            other => Err(MonitorError::invalid(format!(
                "unknown detection strategy '{}', expected 'smoothed' or 'raw_deviation'",
                other
            ))),
        }
    }
}

/// Build the strategy selected by configuration
pub fn build_strategy(
    kind: DetectionStrategy,
    detection: DetectionConfig,
    raw: RawDeviationConfig,
) -> Result<Arc<dyn AnomalyStrategy>> {
    match kind {
        DetectionStrategy::Smoothed => {
            detection.validate()?;
            Ok(Arc::new(SmoothedDeviationStrategy::new(detection)))
        }
        DetectionStrategy::RawDeviation => {
            raw.validate()?;
            Ok(Arc::new(RawDeviationStrategy::new(raw)))
        }
    }
}

/// Timestamps and values of one metric, oldest first
#[derive(Debug, Default)]
pub(crate) struct MetricSamples {
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

/// Extract a metric from oldest-first measurements, skipping readings without it
pub(crate) fn metric_samples(measurements: &[Measurement], metric: Metric) -> MetricSamples {
    let mut samples = MetricSamples::default();
    for m in measurements {
        let value = match metric {
            Metric::Flow => Some(m.volume),
            Metric::Temperature => m.temperature,
        };
        if let Some(value) = value {
            samples.timestamps.push(m.timestamp);
            samples.values.push(value);
        }
    }
    samples
}
