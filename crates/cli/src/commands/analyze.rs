//! Anomaly detection over a snapshot

use anyhow::Result;
use monitor_lib::{build_strategy, AnomalyFinding, DetectionStrategy, MeasurementSeries};
use tabled::Tabled;
use tracing::debug;

use crate::output::{
    color_severity, format_percent, format_reading, print_info, print_success, print_table,
    print_warning, OutputFormat,
};
use crate::thresholds::Thresholds;
use crate::SnapshotArgs;

/// Row for the findings table
#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Measured")]
    measured_at: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Observed")]
    observed: String,
    #[tabled(rename = "Expected")]
    expected: String,
    #[tabled(rename = "Deviation")]
    deviation: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

impl From<&AnomalyFinding> for FindingRow {
    fn from(finding: &AnomalyFinding) -> Self {
        Self {
            unit: finding.unit_name.clone(),
            measured_at: finding.measured_at.format("%Y-%m-%d %H:%M").to_string(),
            metric: finding.metric.to_string(),
            severity: color_severity(finding.severity),
            observed: format_reading(finding.observed_value),
            expected: format_reading(finding.expected_value),
            deviation: format_percent(finding.deviation_percent),
            confidence: format_percent(finding.confidence),
        }
    }
}

/// Detect anomalies for every selected unit
pub fn analyze(
    snapshot: &SnapshotArgs,
    kind: DetectionStrategy,
    thresholds: &Thresholds,
    format: OutputFormat,
) -> Result<()> {
    let units = super::load_units(snapshot)?;
    let as_of = snapshot.as_of()?;
    let strategy = build_strategy(kind, thresholds.detection.clone(), thresholds.raw.clone())?;

    let mut findings = Vec::new();
    let mut rejected = Vec::new();
    for entry in units {
        let series = MeasurementSeries::from_unordered(entry.measurements);
        if series.len() < strategy.min_samples() {
            rejected.push(format!(
                "{}: {} measurements, {} needed",
                entry.unit.unit_id,
                series.len(),
                strategy.min_samples()
            ));
        }
        match strategy.detect(&entry.unit, &series, as_of) {
            Ok(unit_findings) => {
                debug!(unit_id = %entry.unit.unit_id, findings = unit_findings.len(), "Unit analysed");
                findings.extend(unit_findings);
            }
            Err(e) => rejected.push(format!("{}: {}", entry.unit.unit_id, e)),
        }
    }

    let rows: Vec<FindingRow> = findings.iter().map(FindingRow::from).collect();

    match format {
        OutputFormat::Json => print_table(&rows, &findings, format),
        OutputFormat::Table => {
            print_info(&format!("Strategy: {}", strategy.name()));
            for note in &rejected {
                print_warning(note);
            }
            if findings.is_empty() {
                print_success("No anomalies detected");
            } else {
                print_table(&rows, &findings, format);
            }
        }
    }

    Ok(())
}
