//! Maintenance prediction over a snapshot

use anyhow::Result;
use monitor_lib::{MaintenancePrediction, MaintenancePredictor, MeasurementSeries};
use tabled::Tabled;
use tracing::debug;

use crate::output::{color_priority, format_percent, print_table, OutputFormat};
use crate::thresholds::Thresholds;
use crate::SnapshotArgs;

/// Row for the predictions table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Maintenance")]
    maintenance: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Days")]
    days: i64,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

impl From<&MaintenancePrediction> for PredictionRow {
    fn from(prediction: &MaintenancePrediction) -> Self {
        Self {
            unit: prediction.unit_name.clone(),
            maintenance: prediction.maintenance_type.to_string(),
            due: prediction.predicted_date.format("%Y-%m-%d").to_string(),
            days: prediction.estimated_days_remaining,
            priority: color_priority(prediction.priority),
            confidence: format_percent(prediction.confidence * 100.0),
        }
    }
}

/// Predict maintenance for every selected unit, soonest first
pub fn predict(snapshot: &SnapshotArgs, thresholds: &Thresholds, format: OutputFormat) -> Result<()> {
    let units = super::load_units(snapshot)?;
    let as_of = snapshot.as_of()?;
    thresholds.predictor.validate()?;
    let predictor = MaintenancePredictor::new(thresholds.predictor.clone());

    let mut predictions: Vec<MaintenancePrediction> = units
        .into_iter()
        .flat_map(|entry| {
            let series = MeasurementSeries::from_unordered(entry.measurements);
            predictor.predict(&entry.unit, &series, as_of)
        })
        .collect();
    predictions.sort_by_key(|p| p.estimated_days_remaining);
    debug!(predictions = predictions.len(), "Maintenance predicted");

    let rows: Vec<PredictionRow> = predictions.iter().map(PredictionRow::from).collect();
    print_table(&rows, &predictions, format);

    Ok(())
}
