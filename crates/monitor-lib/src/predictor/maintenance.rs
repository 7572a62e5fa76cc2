//! Maintenance date prediction
//!
//! Extrapolates filter volume and UVC-lamp hours to their replacement
//! thresholds and derives the next calendar service date. Every call
//! recomputes from scratch; there is no incremental state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::usage::{average_daily_volume, history_span_days};
use crate::error::{MonitorError, Result};
use crate::models::{
    MaintenancePrediction, MaintenanceType, Measurement, MeasurementSeries, Priority, UnitProfile,
};

/// Thresholds and constants for maintenance prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Filter volume at which the filter must be changed
    pub filter_volume_threshold: f64,
    /// Lamp hours at which the UVC lamp must be replaced
    pub uvc_hours_threshold: f64,
    /// Calendar service cycle anchored on the setup date
    pub service_interval_days: i64,
    /// Usage-based predictions at or beyond this many days are dropped
    pub horizon_days: i64,
    pub high_priority_below_days: i64,
    pub medium_priority_below_days: i64,
    pub filter_confidence: f64,
    pub uvc_confidence: f64,
    pub service_confidence: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            filter_volume_threshold: 10_000.0,
            uvc_hours_threshold: 9_000.0,
            service_interval_days: 365,
            horizon_days: 366,
            high_priority_below_days: 30,
            medium_priority_below_days: 90,
            filter_confidence: 0.75,
            uvc_confidence: 0.85,
            service_confidence: 0.9,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("filter_volume_threshold", self.filter_volume_threshold),
            ("uvc_hours_threshold", self.uvc_hours_threshold),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(MonitorError::invalid(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.service_interval_days < 1 || self.horizon_days < 1 {
            return Err(MonitorError::invalid(format!(
                "service_interval_days and horizon_days must be at least 1, got {} and {}",
                self.service_interval_days, self.horizon_days
            )));
        }
        if self.high_priority_below_days > self.medium_priority_below_days {
            return Err(MonitorError::invalid(format!(
                "high_priority_below_days ({}) exceeds medium_priority_below_days ({})",
                self.high_priority_below_days, self.medium_priority_below_days
            )));
        }
        for (name, value) in [
            ("filter_confidence", self.filter_confidence),
            ("uvc_confidence", self.uvc_confidence),
            ("service_confidence", self.service_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MonitorError::invalid(format!("{} must be in [0, 1], got {}", name, value)));
            }
        }
        Ok(())
    }
}

/// Produces independent filter, UVC and service predictions for one unit
#[derive(Debug, Clone, Default)]
pub struct MaintenancePredictor {
    config: PredictorConfig,
}

impl MaintenancePredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Predict upcoming maintenance from wear counters and history
    ///
    /// Returns between zero and three predictions, one per maintenance type,
    /// in no particular priority order.
    pub fn predict(
        &self,
        unit: &UnitProfile,
        series: &MeasurementSeries,
        as_of: DateTime<Utc>,
    ) -> Vec<MaintenancePrediction> {
        let series = series.ascending();
        let history = series.as_slice();

        let mut predictions = Vec::with_capacity(3);
        if let Some(p) = self.predict_filter_change(unit, average_daily_volume(history), as_of) {
            predictions.push(p);
        }
        if let Some(p) = self.predict_uvc_replacement(unit, history, as_of) {
            predictions.push(p);
        }
        predictions.push(self.predict_general_service(unit, as_of));
        predictions
    }

    /// Days until `current` reaches `threshold` at `rate_per_day`
    ///
    /// `None` when the rate is not positive or the result falls outside
    /// `(0, horizon_days)`.
    pub fn days_until_threshold(&self, current: f64, threshold: f64, rate_per_day: f64) -> Option<i64> {
        if !(rate_per_day > 0.0) || !rate_per_day.is_finite() || !current.is_finite() {
            return None;
        }
        let days = ((threshold - current) / rate_per_day).round().max(0.0) as i64;
        (days > 0 && days < self.config.horizon_days).then_some(days)
    }

    pub fn priority(&self, days_remaining: i64) -> Priority {
        if days_remaining < self.config.high_priority_below_days {
            Priority::High
        } else if days_remaining < self.config.medium_priority_below_days {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    pub fn predict_filter_change(
        &self,
        unit: &UnitProfile,
        avg_daily_volume: f64,
        as_of: DateTime<Utc>,
    ) -> Option<MaintenancePrediction> {
        let Some(days) = self.days_until_threshold(
            unit.current_volume,
            self.config.filter_volume_threshold,
            avg_daily_volume,
        ) else {
            debug!(
                unit_id = %unit.unit_id,
                avg_daily_volume = avg_daily_volume,
                current_volume = unit.current_volume,
                "No filter change within horizon"
            );
            return None;
        };

        Some(self.prediction(
            unit,
            MaintenanceType::FilterChange,
            days,
            self.config.filter_confidence,
            as_of,
        ))
    }

    /// Lamp-hour extrapolation
    ///
    /// Uses the registry's lamp hours, falling back to the newest reading
    /// that carries a lamp-hour counter. `history` may be in either order.
    pub fn predict_uvc_replacement(
        &self,
        unit: &UnitProfile,
        history: &[Measurement],
        as_of: DateTime<Utc>,
    ) -> Option<MaintenancePrediction> {
        let current_hours = unit
            .current_uvc_hours
            .or_else(|| latest_uvc_hours(history))?;

        let hours_per_day = current_hours / history_span_days(history) as f64;
        let Some(days) =
            self.days_until_threshold(current_hours, self.config.uvc_hours_threshold, hours_per_day)
        else {
            debug!(
                unit_id = %unit.unit_id,
                hours_per_day = hours_per_day,
                current_hours = current_hours,
                "No UVC replacement within horizon"
            );
            return None;
        };

        Some(self.prediction(
            unit,
            MaintenanceType::UvcReplacement,
            days,
            self.config.uvc_confidence,
            as_of,
        ))
    }

    /// Next service date on the fixed cycle from the setup date
    pub fn predict_general_service(&self, unit: &UnitProfile, as_of: DateTime<Utc>) -> MaintenancePrediction {
        let interval = self.config.service_interval_days.max(1);
        let days_since_setup = (as_of - unit.setup_date).num_days();
        let days = interval - days_since_setup.rem_euclid(interval);

        self.prediction(
            unit,
            MaintenanceType::GeneralService,
            days,
            self.config.service_confidence,
            as_of,
        )
    }

    fn prediction(
        &self,
        unit: &UnitProfile,
        maintenance_type: MaintenanceType,
        days: i64,
        confidence: f64,
        as_of: DateTime<Utc>,
    ) -> MaintenancePrediction {
        MaintenancePrediction {
            id: Uuid::new_v4(),
            unit_id: unit.unit_id.clone(),
            unit_name: unit.unit_name.clone(),
            maintenance_type,
            predicted_date: as_of + Duration::days(days),
            estimated_days_remaining: days,
            confidence: confidence.clamp(0.0, 1.0),
            priority: self.priority(days),
        }
    }
}

/// Lamp hours of the most recent reading that reports them
fn latest_uvc_hours(history: &[Measurement]) -> Option<f64> {
    history
        .iter()
        .filter_map(|m| m.uvc_hours.map(|hours| (m.timestamp, hours)))
        .max_by_key(|(timestamp, _)| *timestamp)
        .map(|(_, hours)| hours)
}
