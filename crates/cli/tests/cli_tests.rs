//! CLI integration tests

use std::io::Write;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

const AS_OF: &str = "2024-01-21T12:00:00Z";

fn wpu(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wpu"))
        .args(args)
        .env_remove("WPU_STRATEGY")
        .env_remove("WPU_INPUT")
        .env_remove("WPU_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

/// Two units: one with a tenfold flow spike on its last day, one steady
fn snapshot_file() -> NamedTempFile {
    let readings = |spike: bool| -> Vec<serde_json::Value> {
        (0..20)
            .map(|day| {
                let volume = if spike && day == 19 { 1000.0 } else { 100.0 };
                serde_json::json!({
                    "timestamp": format!("2024-01-{:02}T08:00:00Z", day + 1),
                    "volume": volume,
                    "temperature": 22.0
                })
            })
            .collect()
    };

    let snapshot = serde_json::json!({
        "units": [
            {
                "unit": {
                    "unit_id": "unit-1",
                    "unit_name": "Clinic North",
                    "unit_type": "standard",
                    "current_volume": 8000.0,
                    "setup_date": "2023-06-01T00:00:00Z"
                },
                "measurements": readings(true)
            },
            {
                "unit": {
                    "unit_id": "unit-2",
                    "unit_name": "School East",
                    "unit_type": "uvc",
                    "current_volume": 500.0,
                    "current_uvc_hours": 4000.0,
                    "setup_date": "2023-09-15T00:00:00Z"
                },
                "measurements": readings(false)
            }
        ]
    });

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(snapshot.to_string().as_bytes()).unwrap();
    file
}

fn json_stdout(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = wpu(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("analyze"), "Should show analyze command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("run"), "Should show run command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = wpu(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("wpu"), "Should show binary name");
}

#[test]
fn test_analyze_requires_strategy() {
    let file = snapshot_file();
    let output = wpu(&["analyze", "--input", file.path().to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--strategy"), "Should name the missing flag");
}

#[test]
fn test_analyze_rejects_unknown_strategy() {
    let file = snapshot_file();
    let output = wpu(&[
        "analyze",
        "--input",
        file.path().to_str().unwrap(),
        "--strategy",
        "latest",
    ]);

    assert!(!output.status.success());
}

#[test]
fn test_analyze_flags_spike_as_json() {
    let file = snapshot_file();
    let output = wpu(&[
        "--format",
        "json",
        "analyze",
        "--input",
        file.path().to_str().unwrap(),
        "--strategy",
        "smoothed",
        "--as-of",
        AS_OF,
    ]);

    let findings = json_stdout(&output);
    let findings = findings.as_array().unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0]["unit_id"], "unit-1");
    assert_eq!(findings[0]["metric"], "flow");
    assert_eq!(findings[0]["severity"], "high");
}

#[test]
fn test_analyze_raw_deviation_strategy() {
    let file = snapshot_file();
    let output = wpu(&[
        "--format",
        "json",
        "analyze",
        "--input",
        file.path().to_str().unwrap(),
        "--unit",
        "unit-1",
        "--strategy",
        "raw-deviation",
    ]);

    let findings = json_stdout(&output);
    let findings = findings.as_array().unwrap();
    assert!(!findings.is_empty());
    assert!(findings.iter().all(|f| f["unit_id"] == "unit-1"));
}

#[test]
fn test_analyze_table_output() {
    let file = snapshot_file();
    let output = wpu(&[
        "analyze",
        "--input",
        file.path().to_str().unwrap(),
        "--strategy",
        "smoothed",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Clinic North"));
    assert!(stdout.contains("flow"));
}

#[test]
fn test_predict_lists_service_for_every_unit() {
    let file = snapshot_file();
    let output = wpu(&[
        "--format",
        "json",
        "predict",
        "--input",
        file.path().to_str().unwrap(),
        "--as-of",
        AS_OF,
    ]);

    let predictions = json_stdout(&output);
    let predictions = predictions.as_array().unwrap();
    let services = predictions
        .iter()
        .filter(|p| p["maintenance_type"] == "general_service")
        .count();
    assert_eq!(services, 2);

    // Soonest first
    let days: Vec<i64> = predictions
        .iter()
        .map(|p| p["estimated_days_remaining"].as_i64().unwrap())
        .collect();
    assert!(days.windows(2).all(|w| w[0] <= w[1]));
}

fn uvc_days(output: &Output) -> Option<i64> {
    json_stdout(output)
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["unit_id"] == "unit-2" && p["maintenance_type"] == "uvc_replacement")
        .map(|p| p["estimated_days_remaining"].as_i64().unwrap())
}

#[test]
fn test_predict_thresholds_from_flags() {
    let file = snapshot_file();
    let path = file.path().to_str().unwrap();

    // 4000 h over 19 days of history
    let defaults = wpu(&["--format", "json", "predict", "--input", path, "--as-of", AS_OF]);
    assert_eq!(uvc_days(&defaults), Some(24));

    let lowered = wpu(&[
        "--format",
        "json",
        "predict",
        "--input",
        path,
        "--as-of",
        AS_OF,
        "--uvc-threshold",
        "5000",
    ]);
    assert_eq!(uvc_days(&lowered), Some(5));

    let short_horizon = wpu(&[
        "--format",
        "json",
        "predict",
        "--input",
        path,
        "--as-of",
        AS_OF,
        "--horizon-days",
        "10",
    ]);
    assert_eq!(uvc_days(&short_horizon), None);
}

#[test]
fn test_predict_thresholds_from_tuning_file() {
    let file = snapshot_file();
    let mut tuning = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(tuning, "[predictor]\nuvc_hours_threshold = 5000.0").unwrap();

    let output = wpu(&[
        "--format",
        "json",
        "--config",
        tuning.path().to_str().unwrap(),
        "predict",
        "--input",
        file.path().to_str().unwrap(),
        "--as-of",
        AS_OF,
    ]);
    assert_eq!(uvc_days(&output), Some(5));
}

#[test]
fn test_invalid_threshold_flag_fails() {
    let file = snapshot_file();
    let output = wpu(&[
        "predict",
        "--input",
        file.path().to_str().unwrap(),
        "--uvc-threshold",
        "0",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("uvc_hours_threshold"));
}

#[test]
fn test_verbose_logs_to_stderr() {
    let file = snapshot_file();
    let output = wpu(&[
        "--verbose",
        "--format",
        "json",
        "predict",
        "--input",
        file.path().to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Loaded fleet snapshot"));
    assert!(stderr.contains("Maintenance predicted"));
    // Logs never leak into the JSON on stdout
    serde_json::from_slice::<serde_json::Value>(&output.stdout).unwrap();
}

#[test]
fn test_run_reports_alerts() {
    let file = snapshot_file();
    let output = wpu(&[
        "--format",
        "json",
        "run",
        "--input",
        file.path().to_str().unwrap(),
        "--strategy",
        "smoothed",
    ]);

    let report = json_stdout(&output);
    assert_eq!(report["units"].as_array().unwrap().len(), 2);
    assert!(report["failures"].as_array().unwrap().is_empty());

    let spiking = report["units"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["unit_id"] == "unit-1")
        .unwrap();
    assert_eq!(spiking["alerts_created"], 1);
}

#[test]
fn test_unknown_unit_fails() {
    let file = snapshot_file();
    let output = wpu(&[
        "predict",
        "--input",
        file.path().to_str().unwrap(),
        "--unit",
        "unit-9",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unit-9"));
}

#[test]
fn test_missing_input_file_fails() {
    let output = wpu(&["predict", "--input", "/nonexistent/fleet.json"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("fleet snapshot"));
}

/// Test invalid command handling
#[test]
fn test_invalid_command() {
    let output = wpu(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
}
