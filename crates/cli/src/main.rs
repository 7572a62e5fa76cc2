//! Water Purification Unit CLI
//!
//! Runs anomaly detection and maintenance prediction over a fleet snapshot
//! file, either step by step or as a full orchestrated batch.

mod commands;
mod output;
mod thresholds;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use commands::{analyze, predict, run};
use monitor_lib::DetectionStrategy;
use thresholds::Thresholds;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Water Purification Unit CLI
#[derive(Parser)]
#[command(name = "wpu")]
#[command(author, version, about = "CLI for purifier fleet anomaly detection and maintenance prediction", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output (debug logs on stderr)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Tuning file with `detection`, `raw` and `predictor` sections
    #[arg(long, global = true, env = "WPU_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect anomalies in unit measurements
    Analyze {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        #[command(flatten)]
        detection: DetectionArgs,
    },

    /// Predict upcoming maintenance
    Predict {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        #[command(flatten)]
        predictor: PredictorArgs,
    },

    /// Run the full detect, predict and persist cycle over the snapshot
    Run {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        #[command(flatten)]
        detection: DetectionArgs,

        #[command(flatten)]
        predictor: PredictorArgs,

        /// Measurements considered per unit (newest first)
        #[arg(long, default_value_t = 100)]
        history_limit: usize,
    },
}

/// Where the fleet data comes from
#[derive(Args, Clone)]
pub struct SnapshotArgs {
    /// Fleet snapshot JSON file
    #[arg(long, short, env = "WPU_INPUT")]
    pub input: PathBuf,

    /// Restrict to a single unit
    #[arg(long, short)]
    pub unit: Option<String>,

    /// Reference time for results (RFC 3339, defaults to now)
    #[arg(long)]
    pub as_of: Option<String>,
}

impl SnapshotArgs {
    pub fn as_of(&self) -> Result<DateTime<Utc>> {
        match &self.as_of {
            Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
                .with_context(|| format!("Invalid --as-of timestamp '{}'", raw))?
                .with_timezone(&Utc)),
            None => Ok(Utc::now()),
        }
    }
}

/// Detection strategy and its tuning
#[derive(Args, Clone)]
pub struct DetectionArgs {
    /// Detection strategy (smoothed, raw-deviation)
    #[arg(long, short, env = "WPU_STRATEGY")]
    pub strategy: DetectionStrategy,

    /// Moving average window
    #[arg(long)]
    pub window: Option<usize>,

    /// Exponential smoothing factor in (0, 1]
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Standard deviation threshold
    #[arg(long)]
    pub threshold: Option<f64>,

    /// z-score threshold for raw deviation
    #[arg(long)]
    pub z_score: Option<f64>,

    /// Lowest acceptable water temperature (°C)
    #[arg(long, allow_negative_numbers = true)]
    pub temp_min: Option<f64>,

    /// Highest acceptable water temperature (°C)
    #[arg(long)]
    pub temp_max: Option<f64>,
}

impl DetectionArgs {
    /// Layer the flags over the tuning file's detection sections
    pub fn apply(&self, thresholds: &mut Thresholds) {
        let detection = &mut thresholds.detection;
        if let Some(window) = self.window {
            detection.moving_average_window = window;
        }
        if let Some(alpha) = self.alpha {
            detection.smoothing_factor = alpha;
        }
        if let Some(threshold) = self.threshold {
            detection.standard_deviation_threshold = threshold;
        }

        let raw = &mut thresholds.raw;
        if let Some(z_score) = self.z_score {
            raw.z_score_threshold = z_score;
        }
        if let Some(min) = self.temp_min {
            raw.temperature_min = min;
        }
        if let Some(max) = self.temp_max {
            raw.temperature_max = max;
        }
    }
}

/// Maintenance thresholds
#[derive(Args, Clone)]
pub struct PredictorArgs {
    /// Filter volume at which the filter is changed
    #[arg(long)]
    pub filter_threshold: Option<f64>,

    /// Lamp hours at which the UVC lamp is replaced
    #[arg(long)]
    pub uvc_threshold: Option<f64>,

    /// Drop usage-based predictions this many days out or later
    #[arg(long)]
    pub horizon_days: Option<i64>,
}

impl PredictorArgs {
    /// Layer the flags over the tuning file's predictor section
    pub fn apply(&self, thresholds: &mut Thresholds) {
        let predictor = &mut thresholds.predictor;
        if let Some(threshold) = self.filter_threshold {
            predictor.filter_volume_threshold = threshold;
        }
        if let Some(threshold) = self.uvc_threshold {
            predictor.uvc_hours_threshold = threshold;
        }
        if let Some(days) = self.horizon_days {
            predictor.horizon_days = days;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .init();
    }

    let mut thresholds = Thresholds::load(cli.config.as_deref())?;

    // Execute command
    match cli.command {
        Commands::Analyze {
            snapshot,
            detection,
        } => {
            detection.apply(&mut thresholds);
            debug!(command = "analyze", strategy = %detection.strategy, "Thresholds resolved");
            analyze::analyze(&snapshot, detection.strategy, &thresholds, cli.format)?;
        }
        Commands::Predict {
            snapshot,
            predictor,
        } => {
            predictor.apply(&mut thresholds);
            debug!(command = "predict", "Thresholds resolved");
            predict::predict(&snapshot, &thresholds, cli.format)?;
        }
        Commands::Run {
            snapshot,
            detection,
            predictor,
            history_limit,
        } => {
            detection.apply(&mut thresholds);
            predictor.apply(&mut thresholds);
            debug!(command = "run", strategy = %detection.strategy, "Thresholds resolved");
            run::run(
                &snapshot,
                detection.strategy,
                &thresholds,
                history_limit,
                cli.format,
            )
            .await?;
        }
    }

    Ok(())
}
