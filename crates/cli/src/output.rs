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

/// Print any response as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
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

/// Format a fare in dollars
pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

/// Signed difference against the historical average
pub fn format_delta(difference: f64) -> String {
    if difference < 0.0 {
        format!("-${:.2}", difference.abs())
    } else {
        format!("+${:.2}", difference)
    }
}

/// Cheaper than usual is good news, so the coloring is inverted
pub fn color_delta(difference: f64) -> String {
    let formatted = format_delta(difference);
    if difference > 0.0 {
        formatted.red().to_string()
    } else if difference < 0.0 {
        formatted.green().to_string()
    } else {
        formatted.dimmed().to_string()
    }
}
