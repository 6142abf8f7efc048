//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Pretty-print any response as JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a megabyte figure
pub fn format_mb(mb: u64) -> String {
    if mb >= 1024 {
        format!("{:.2}Gi", mb as f64 / 1024.0)
    } else {
        format!("{}Mi", mb)
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Render a millisecond Unix timestamp as a UTC date and time
pub fn format_timestamp_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Tier a value falls into given ascending warning/critical/failure limits
pub fn tier_label(value: f64, warning: f64, critical: f64, failure: f64) -> &'static str {
    if value >= failure {
        "failure"
    } else if value >= critical {
        "critical"
    } else if value >= warning {
        "warning"
    } else {
        "normal"
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" | "normal" => status.green().to_string(),
        "degraded" | "warning" => status.yellow().to_string(),
        "critical" => status.bright_red().to_string(),
        "unhealthy" | "not ready" | "failure" => status.red().to_string(),
        _ => status.to_string(),
    }
}
