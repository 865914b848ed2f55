//! CLI output helpers.

use serde::Serialize;
use tabled::{Table, Tabled};

/// How CLI results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table.
    Table,
    /// Machine-readable JSON.
    Json,
}

/// Print a list of rows in the selected format.
pub fn print_list<T: Tabled + Serialize>(rows: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("(no entries)");
            } else {
                println!("{}", Table::new(rows));
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(rows) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Failed to serialize output: {e}"),
        },
    }
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("✓ {message}");
}
