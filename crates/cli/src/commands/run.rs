//! Full orchestrated batch over a snapshot

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use monitor_lib::{
    build_strategy,
    orchestrator::{BatchHealth, UnitReport},
    DetectionOrchestrator, DetectionStrategy, FleetSnapshot, InMemoryStore, MaintenancePredictor,
    OrchestratorConfig,
};
use tabled::Tabled;
use tracing::debug;

use crate::output::{color_status, print_info, print_table, print_warning, OutputFormat};
use crate::thresholds::Thresholds;
use crate::SnapshotArgs;

/// Row for the per-unit summary table
#[derive(Tabled)]
struct UnitRow {
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Measurements")]
    measurements: usize,
    #[tabled(rename = "Findings")]
    findings: usize,
    #[tabled(rename = "Alerts")]
    alerts: usize,
    #[tabled(rename = "Predictions")]
    predictions: usize,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&UnitReport> for UnitRow {
    fn from(report: &UnitReport) -> Self {
        Self {
            unit: report.unit_id.clone(),
            measurements: report.measurements_analyzed,
            findings: report.findings.len(),
            alerts: report.alerts_created,
            predictions: report.predictions_saved,
            status: if report.has_failures() {
                color_status("degraded")
            } else {
                color_status("ok")
            },
        }
    }
}

/// Run detection, prediction and alerting for the selected units
pub async fn run(
    snapshot: &SnapshotArgs,
    kind: DetectionStrategy,
    thresholds: &Thresholds,
    history_limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let units = super::load_units(snapshot)?;
    let as_of = snapshot.as_of()?;
    let unit_ids: Vec<String> = units.iter().map(|u| u.unit.unit_id.clone()).collect();

    let store = Arc::new(InMemoryStore::from_snapshot(FleetSnapshot { units }));
    let strategy = build_strategy(kind, thresholds.detection.clone(), thresholds.raw.clone())?;
    thresholds.predictor.validate()?;
    let orchestrator = Arc::new(
        DetectionOrchestrator::builder()
            .store(store.clone())
            .strategy(strategy)
            .predictor(MaintenancePredictor::new(thresholds.predictor.clone()))
            .config(OrchestratorConfig {
                history_limit,
                unit_timeout: None,
                ..Default::default()
            })
            .instance("wpu")
            .build()?,
    );

    let report = orchestrator.run_batch(unit_ids, as_of).await;
    debug!(
        units = report.total_units(),
        failures = report.failures.len(),
        alerts = report.alerts_created(),
        "Batch finished"
    );

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            print_info(&format!("Strategy: {}", orchestrator.strategy_name()));
            let rows: Vec<UnitRow> = report.units.iter().map(UnitRow::from).collect();
            print_table(&rows, &report.units, format);

            for failure in &report.failures {
                print_warning(&format!("{}: {}", failure.unit_id, failure.error));
            }
            for unit in &report.units {
                for error in unit.detection_error.iter().chain(unit.errors.iter()) {
                    print_warning(&format!("{}: {}", unit.unit_id, error));
                }
            }

            let alerts: Vec<_> = report
                .units
                .iter()
                .flat_map(|u| store.alerts_for(&u.unit_id))
                .collect();
            if !alerts.is_empty() {
                println!();
                println!("{}", "Alerts".bold());
                println!("{}", "-".repeat(50));
                for alert in &alerts {
                    println!("{} {}", "!".red().bold(), alert.message);
                }
            }

            let health = match report.health() {
                BatchHealth::Healthy => "healthy",
                BatchHealth::Degraded => "degraded",
                BatchHealth::Unhealthy => "unhealthy",
            };
            println!();
            println!(
                "{} {} ({} units, {} alerts, {} predictions saved)",
                "Batch:".bold(),
                color_status(health),
                report.total_units(),
                report.alerts_created(),
                report.predictions_saved()
            );
        }
    }

    Ok(())
}
