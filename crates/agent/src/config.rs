//! Monitor configuration

use std::time::Duration;

use anyhow::{Context, Result};
use monitor_lib::{
    orchestrator::OrchestratorConfig, DetectionConfig, DetectionStrategy, MaintenancePredictor,
    PredictorConfig, RawDeviationConfig,
};
use serde::Deserialize;

/// Monitor configuration
///
/// Read from `MONITOR_*` environment variables, optionally layered over the
/// file named by `MONITOR_CONFIG_FILE`. Threshold sections nest with a
/// double underscore, e.g. `MONITOR_PREDICTOR__FILTER_VOLUME_THRESHOLD`.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Detection strategy; no default, deployments must pick one
    pub strategy: DetectionStrategy,

    /// Fleet snapshot with unit profiles and measurement history
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// API server port for health/report/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Name recorded on structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Smoothed strategy thresholds
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Raw deviation strategy thresholds
    #[serde(default)]
    pub raw: RawDeviationConfig,

    /// Maintenance thresholds and horizon
    #[serde(default)]
    pub predictor: PredictorConfig,

    /// Measurements fetched per unit
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default = "default_run_interval")]
    pub run_interval_secs: u64,

    /// Per-unit deadline in seconds; 0 disables it
    #[serde(default = "default_unit_timeout")]
    pub unit_timeout_secs: u64,

    #[serde(default = "default_max_concurrent_units")]
    pub max_concurrent_units: usize,
}

fn default_snapshot_path() -> String {
    "fleet.json".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "purifier-monitor".to_string())
}

fn default_history_limit() -> usize {
    100
}

fn default_run_interval() -> u64 {
    900
}

fn default_unit_timeout() -> u64 {
    30
}

fn default_max_concurrent_units() -> usize {
    16
}

impl MonitorConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var("MONITOR_CONFIG_FILE") {
            builder = builder.add_source(config::File::with_name(&path));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("MONITOR")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        let parsed: Self = config
            .try_deserialize()
            .context("Invalid monitor configuration (MONITOR_STRATEGY must be set)")?;
        parsed.detection.validate().context("Invalid detection section")?;
        parsed.raw.validate().context("Invalid raw section")?;
        parsed.predictor.validate().context("Invalid predictor section")?;
        Ok(parsed)
    }

    pub fn predictor(&self) -> MaintenancePredictor {
        MaintenancePredictor::new(self.predictor.clone())
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            history_limit: self.history_limit,
            unit_timeout: (self.unit_timeout_secs > 0)
                .then(|| Duration::from_secs(self.unit_timeout_secs)),
            max_concurrent_units: self.max_concurrent_units,
            run_interval: Duration::from_secs(self.run_interval_secs.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(overrides: &[(&str, &str)]) -> Result<MonitorConfig> {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        MonitorConfig::from_config(builder.build()?)
    }

    #[test]
    fn test_strategy_is_required() {
        assert!(build(&[]).is_err());
    }

    #[test]
    fn test_defaults_apply() {
        let config = build(&[("strategy", "smoothed")]).unwrap();
        assert_eq!(config.strategy, DetectionStrategy::Smoothed);
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.detection, DetectionConfig::default());
        assert_eq!(config.raw, RawDeviationConfig::default());
        assert_eq!(config.predictor().config(), &PredictorConfig::default());

        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.history_limit, 100);
        assert_eq!(orchestrator.unit_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_overrides_and_disabled_timeout() {
        let config = build(&[
            ("strategy", "raw_deviation"),
            ("detection.moving_average_window", "7"),
            ("unit_timeout_secs", "0"),
        ])
        .unwrap();
        assert_eq!(config.strategy, DetectionStrategy::RawDeviation);
        assert_eq!(config.detection.moving_average_window, 7);
        assert_eq!(config.orchestrator_config().unit_timeout, None);
    }

    #[test]
    fn test_hyphenated_strategy_is_accepted() {
        let config = build(&[("strategy", "raw-deviation")]).unwrap();
        assert_eq!(config.strategy, DetectionStrategy::RawDeviation);
    }

    #[test]
    fn test_threshold_sections_override() {
        let config = build(&[
            ("strategy", "smoothed"),
            ("detection.standard_deviation_threshold", "2.5"),
            ("detection.flow.materiality_floor_percent", "15"),
            ("detection.flow.high_above_percent", "80"),
            ("detection.flow.medium_above_percent", "40"),
            ("raw.temperature_max", "30"),
            ("raw.recent_window", "3"),
            ("predictor.filter_volume_threshold", "12000"),
            ("predictor.horizon_days", "180"),
        ])
        .unwrap();

        assert_eq!(config.detection.standard_deviation_threshold, 2.5);
        assert_eq!(config.detection.flow.high_above_percent, 80.0);
        assert_eq!(config.detection.temperature, DetectionConfig::default().temperature);
        assert_eq!(config.raw.temperature_max, 30.0);
        assert_eq!(config.raw.recent_window, 3);
        assert_eq!(config.raw.temperature_min, RawDeviationConfig::default().temperature_min);

        let predictor = config.predictor();
        assert_eq!(predictor.config().filter_volume_threshold, 12_000.0);
        assert_eq!(predictor.config().horizon_days, 180);
        assert_eq!(predictor.config().uvc_hours_threshold, 9_000.0);
        assert_eq!(predictor.days_until_threshold(0.0, 179.0, 1.0), Some(179));
        assert_eq!(predictor.days_until_threshold(0.0, 180.0, 1.0), None);
    }

    #[test]
    fn test_invalid_detection_config_is_rejected() {
        assert!(build(&[("strategy", "smoothed"), ("detection.smoothing_factor", "1.5")]).is_err());
    }

    #[test]
    fn test_invalid_predictor_config_is_rejected() {
        assert!(build(&[("strategy", "smoothed"), ("predictor.uvc_hours_threshold", "0")]).is_err());
    }
}
