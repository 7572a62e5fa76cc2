//! CLI command implementations

pub mod analyze;
pub mod predict;
pub mod run;

use anyhow::{bail, Result};
use monitor_lib::{orchestrator::UnitSnapshot, FleetSnapshot};
use tracing::debug;

use crate::SnapshotArgs;

/// Load the snapshot and keep the requested unit, or every unit
pub fn load_units(args: &SnapshotArgs) -> Result<Vec<UnitSnapshot>> {
    let snapshot = FleetSnapshot::load(&args.input)?;
    debug!(
        path = %args.input.display(),
        units = snapshot.units.len(),
        "Loaded fleet snapshot"
    );

    match &args.unit {
        Some(unit_id) => {
            let selected: Vec<_> = snapshot
                .units
                .into_iter()
                .filter(|entry| &entry.unit.unit_id == unit_id)
                .collect();
            if selected.is_empty() {
                bail!("Unit '{}' not found in {}", unit_id, args.input.display());
            }
            Ok(selected)
        }
        None => Ok(snapshot.units),
    }
}
