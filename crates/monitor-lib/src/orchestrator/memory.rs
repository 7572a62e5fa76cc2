//! In-memory backend for all four store roles
//!
//! Backs the agent and CLI when units and history come from a JSON fleet
//! snapshot instead of a database.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::{async_trait, AlertSink, MeasurementStore, PredictionStore, UnitRegistry};
use crate::models::{
    AlertRecord, MaintenancePrediction, MaintenanceType, Measurement, SortOrder, UnitProfile,
};

/// One unit and its recorded measurements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub unit: UnitProfile,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

/// Fleet state loaded from disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub units: Vec<UnitSnapshot>,
}

impl FleetSnapshot {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fleet snapshot {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid fleet snapshot {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Concurrent in-memory store
///
/// Measurements are kept oldest-first. Predictions are keyed by unit and
/// maintenance type so a later save replaces the earlier forecast.
#[derive(Default)]
pub struct InMemoryStore {
    units: DashMap<String, UnitProfile>,
    measurements: DashMap<String, Vec<Measurement>>,
    alerts: DashMap<String, Vec<AlertRecord>>,
    predictions: DashMap<(String, MaintenanceType), MaintenancePrediction>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: FleetSnapshot) -> Self {
        let store = Self::new();
        for entry in snapshot.units {
            let unit_id = entry.unit.unit_id.clone();
            store.insert_unit(entry.unit);
            store.append_measurements(&unit_id, entry.measurements);
        }
        store
    }

    pub fn insert_unit(&self, unit: UnitProfile) {
        self.units.insert(unit.unit_id.clone(), unit);
    }

    pub fn append_measurements(&self, unit_id: &str, measurements: Vec<Measurement>) {
        let mut history = self.measurements.entry(unit_id.to_string()).or_default();
        history.extend(measurements);
        history.sort_by_key(|m| m.timestamp);
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn alerts_for(&self, unit_id: &str) -> Vec<AlertRecord> {
        self.alerts
            .get(unit_id)
            .map(|alerts| alerts.clone())
            .unwrap_or_default()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.iter().map(|entry| entry.value().len()).sum()
    }

    /// Current predictions for a unit, in maintenance type order
    pub fn predictions_for(&self, unit_id: &str) -> Vec<MaintenancePrediction> {
        let mut predictions: Vec<_> = self
            .predictions
            .iter()
            .filter(|entry| entry.key().0 == unit_id)
            .map(|entry| entry.value().clone())
            .collect();
        predictions.sort_by_key(|p| p.maintenance_type as u8);
        predictions
    }

    pub fn prediction_count(&self) -> usize {
        self.predictions.len()
    }
}

#[async_trait]
impl MeasurementStore for InMemoryStore {
    async fn fetch_measurements(
        &self,
        unit_id: &str,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<Measurement>> {
        if !self.units.contains_key(unit_id) {
            return Err(anyhow!("Unknown unit {}", unit_id));
        }

        let history = self
            .measurements
            .get(unit_id)
            .map(|h| h.clone())
            .unwrap_or_default();
        let skip = history.len().saturating_sub(limit);
        let mut latest: Vec<_> = history.into_iter().skip(skip).collect();

        if order == SortOrder::Descending {
            latest.reverse();
        }
        Ok(latest)
    }
}

#[async_trait]
impl UnitRegistry for InMemoryStore {
    async fn get_unit(&self, unit_id: &str) -> Result<UnitProfile> {
        self.units
            .get(unit_id)
            .map(|unit| unit.clone())
            .ok_or_else(|| anyhow!("Unknown unit {}", unit_id))
    }

    async fn list_units(&self) -> Result<Vec<String>> {
        let mut ids: Vec<_> = self.units.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl AlertSink for InMemoryStore {
    async fn create_alert(&self, alert: AlertRecord) -> Result<()> {
        self.alerts.entry(alert.unit_id.clone()).or_default().push(alert);
        Ok(())
    }
}

#[async_trait]
impl PredictionStore for InMemoryStore {
    async fn save_prediction(&self, prediction: &MaintenancePrediction) -> Result<()> {
        self.predictions.insert(
            (prediction.unit_id.clone(), prediction.maintenance_type),
            prediction.clone(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Severity, UnitType};
    use chrono::{Duration, TimeZone, Utc};
    use std::io::Write;
    use uuid::Uuid;

    fn unit(id: &str) -> UnitProfile {
        UnitProfile {
            unit_id: id.to_string(),
            unit_name: format!("Unit {}", id),
            unit_type: UnitType::Standard,
            current_volume: 1000.0,
            current_uvc_hours: None,
            setup_date: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    fn readings(count: i64) -> Vec<Measurement> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        (0..count)
            .map(|day| Measurement {
                timestamp: start + Duration::days(day),
                volume: 100.0 + day as f64,
                temperature: None,
                uvc_hours: None,
            })
            .collect()
    }

    fn prediction(id: &str, days: i64) -> MaintenancePrediction {
        MaintenancePrediction {
            id: Uuid::new_v4(),
            unit_id: id.to_string(),
            unit_name: format!("Unit {}", id),
            maintenance_type: MaintenanceType::FilterChange,
            predicted_date: Utc::now() + Duration::days(days),
            estimated_days_remaining: days,
            confidence: 0.75,
            priority: Priority::Medium,
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_latest_in_requested_order() {
        let store = InMemoryStore::new();
        store.insert_unit(unit("a"));
        let mut shuffled = readings(10);
        shuffled.reverse();
        store.append_measurements("a", shuffled);

        let desc = store
            .fetch_measurements("a", SortOrder::Descending, 3)
            .await
            .unwrap();
        let volumes: Vec<f64> = desc.iter().map(|m| m.volume).collect();
        assert_eq!(volumes, vec![109.0, 108.0, 107.0]);

        let asc = store
            .fetch_measurements("a", SortOrder::Ascending, 3)
            .await
            .unwrap();
        let volumes: Vec<f64> = asc.iter().map(|m| m.volume).collect();
        assert_eq!(volumes, vec![107.0, 108.0, 109.0]);
    }

    #[tokio::test]
    async fn test_unknown_unit_is_an_error() {
        let store = InMemoryStore::new();
        assert!(store.get_unit("ghost").await.is_err());
        assert!(store
            .fetch_measurements("ghost", SortOrder::Ascending, 10)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_prediction_save_replaces_same_type() {
        let store = InMemoryStore::new();
        store.save_prediction(&prediction("a", 40)).await.unwrap();
        store.save_prediction(&prediction("a", 35)).await.unwrap();

        let saved = store.predictions_for("a");
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].estimated_days_remaining, 35);
    }

    #[tokio::test]
    async fn test_alerts_accumulate_per_unit() {
        let store = InMemoryStore::new();
        for _ in 0..2 {
            store
                .create_alert(AlertRecord {
                    unit_id: "a".to_string(),
                    message: "flow anomaly".to_string(),
                    severity: Severity::High,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.alerts_for("a").len(), 2);
        assert!(store.alerts_for("b").is_empty());
        assert_eq!(store.alert_count(), 2);
    }

    #[test]
    fn test_snapshot_load_from_file() {
        let snapshot = FleetSnapshot {
            units: vec![UnitSnapshot {
                unit: unit("a"),
                measurements: readings(4),
            }],
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&snapshot).unwrap().as_bytes())
            .unwrap();

        let loaded = FleetSnapshot::load(file.path()).unwrap();
        let store = InMemoryStore::from_snapshot(loaded);
        assert_eq!(store.unit_count(), 1);
    }

    #[test]
    fn test_snapshot_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ \"units\": [ { \"unit\": 42 } ] }").unwrap();

        let err = FleetSnapshot::load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid fleet snapshot"));
    }
}
