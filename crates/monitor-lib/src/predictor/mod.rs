//! Maintenance prediction engine

mod maintenance;
mod usage;

pub use maintenance::{MaintenancePredictor, PredictorConfig};
pub use usage::{average_daily_volume, daily_peak_volume, history_span_days};
