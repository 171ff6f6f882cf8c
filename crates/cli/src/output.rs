//! Output formatting utilities

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use predictor_lib::FailureCategory;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::process::ExitCode;
use tabled::{settings::Style, Table, Tabled};

/// Exit status for a command that ran but could not produce an answer
pub const UNAVAILABLE_EXIT: u8 = 2;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Render rows as a rounded table
pub fn render_table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Report an unavailable answer and pick the exit status
pub fn unavailable(
    category: FailureCategory,
    details: &str,
    format: OutputFormat,
) -> Result<ExitCode> {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "error": category.as_str(),
            "message": category.message(),
            "details": details,
        }))?,
        OutputFormat::Table => {
            print_error(category.message());
            eprintln!("  {}", details.dimmed());
        }
    }
    Ok(ExitCode::from(UNAVAILABLE_EXIT))
}

/// Format currency
pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", -amount)
    } else {
        format!("${:.2}", amount)
    }
}

/// Format a duration given in seconds as minutes
pub fn format_minutes(seconds: f64) -> String {
    format!("{:.1} min", seconds / 60.0)
}

/// Format confidence as percentage
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}

/// Color confidence based on value
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_confidence(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color a model family label
pub fn color_family(label: &str, is_tree: bool) -> String {
    if is_tree {
        label.green().to_string()
    } else {
        label.cyan().to_string()
    }
}

/// Print the Prometheus text exposition of everything registered so far
pub fn print_metrics() -> Result<()> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    print!("{}", String::from_utf8(buffer).context("Metrics are not UTF-8")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(21.5), "$21.50");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(-3.5), "-$3.50");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(900.0), "15.0 min");
        assert_eq!(format_minutes(90.0), "1.5 min");
    }

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(0.75), "75%");
        assert_eq!(format_confidence(1.0), "100%");
    }
}
