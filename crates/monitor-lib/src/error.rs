//! Error taxonomy for detection, prediction and persistence

use thiserror::Error;

/// Errors produced by the monitoring core
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Fewer measurements than a window or history requirement
    #[error("insufficient data: need {required} measurements, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// Malformed numeric input (mismatched lengths, non-finite values, bad config)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Reading the unit profile or its measurements failed
    #[error("failed to fetch data for unit {unit_id}: {reason}")]
    Fetch { unit_id: String, reason: String },

    /// Listing monitored units failed
    #[error("failed to list units: {0}")]
    Registry(String),

    /// A downstream store rejected a write
    #[error("failed to persist {target} for unit {unit_id}: {reason}")]
    Persistence {
        unit_id: String,
        target: &'static str,
        reason: String,
    },

    /// The caller-imposed per-unit deadline elapsed
    #[error("processing unit {unit_id} timed out")]
    Timeout { unit_id: String },
}

impl MonitorError {
    /// Insufficient data yields empty results; everything else aborts the computation
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MonitorError::InsufficientData { .. })
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        MonitorError::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
