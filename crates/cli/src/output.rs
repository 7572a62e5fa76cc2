//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use monitor_lib::{Priority, Severity};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table of rows, or the raw records as JSON
pub fn print_table<T: Tabled, R: Serialize>(rows: &[T], records: &[R], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(records) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a 0-100 score as a percentage
pub fn format_percent(value: f64) -> String {
    format!("{:.0}%", value)
}

/// Format a reading with one decimal
pub fn format_reading(value: f64) -> String {
    format!("{:.1}", value)
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ok" => status.green().to_string(),
        "degraded" | "warning" => status.yellow().to_string(),
        "unhealthy" | "error" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

pub fn color_severity(severity: Severity) -> String {
    let label = severity.to_string();
    match severity {
        Severity::High => label.red().bold().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::Low => label.normal().to_string(),
    }
}

pub fn color_priority(priority: Priority) -> String {
    let label = priority.to_string();
    match priority {
        Priority::High => label.red().bold().to_string(),
        Priority::Medium => label.yellow().to_string(),
        Priority::Low => label.green().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent_rounds() {
        assert_eq!(format_percent(42.4), "42%");
        assert_eq!(format_percent(99.6), "100%");
    }

    #[test]
    fn test_format_reading_one_decimal() {
        assert_eq!(format_reading(24.0), "24.0");
        assert_eq!(format_reading(1234.56), "1234.6");
    }

    #[test]
    fn test_color_labels_keep_text() {
        colored::control::set_override(false);
        assert_eq!(color_severity(Severity::High), "high");
        assert_eq!(color_priority(Priority::Low), "low");
        assert_eq!(color_status("degraded"), "degraded");
    }
}
