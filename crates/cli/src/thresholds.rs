//! Tuning file support
//!
//! Thresholds come from an optional config file (TOML, YAML or JSON) with
//! `detection`, `raw` and `predictor` sections, the same shape the agent
//! reads. Command-line flags are applied on top.

use std::path::Path;

use anyhow::{Context, Result};
use monitor_lib::{DetectionConfig, PredictorConfig, RawDeviationConfig};
use serde::Deserialize;
use tracing::debug;

/// Detection and prediction thresholds for one invocation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub detection: DetectionConfig,
    pub raw: RawDeviationConfig,
    pub predictor: PredictorConfig,
}

impl Thresholds {
    /// Read the tuning file, or fall back to built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let thresholds: Thresholds = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .and_then(|c| c.try_deserialize::<Thresholds>())
            .with_context(|| format!("Invalid tuning file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded tuning file");
        Ok(thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_path_uses_defaults() {
        let thresholds = Thresholds::load(None).unwrap();
        assert_eq!(thresholds.predictor, PredictorConfig::default());
        assert_eq!(thresholds.raw, RawDeviationConfig::default());
    }

    #[test]
    fn test_sections_are_read_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[predictor]\nuvc_hours_threshold = 8000.0\n\n[raw]\ntemperature_max = 30.0\n"
        )
        .unwrap();

        let thresholds = Thresholds::load(Some(file.path())).unwrap();
        assert_eq!(thresholds.predictor.uvc_hours_threshold, 8000.0);
        assert_eq!(thresholds.predictor.filter_volume_threshold, 10_000.0);
        assert_eq!(thresholds.raw.temperature_max, 30.0);
        assert_eq!(thresholds.detection, DetectionConfig::default());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let err = Thresholds::load(Some(Path::new("/nonexistent/tuning.toml"))).unwrap_err();
        assert!(err.to_string().contains("tuning file"));
    }
}
