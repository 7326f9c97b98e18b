//! Command output. Tables and symbols for humans, one JSON document per
//! result for `--format json`.

use serde::Serialize;
use serde_json::{Value, json};
use tabled::{Table, Tabled};

use memostore_core::error::AppError;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Outcome of a command that produces no data of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warning,
}

impl Status {
    fn symbol(self) -> &'static str {
        match self {
            Self::Ok => "✓",
            Self::Warning => "⚠",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
        }
    }
}

/// Print stored entries as table rows or a JSON array.
pub fn print_list<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table if rows.is_empty() => println!("No entries stored."),
        OutputFormat::Table => println!("{}", Table::new(rows)),
        OutputFormat::Json => print_json(rows),
    }
}

/// Print a single record. Table mode uses its `Debug` form.
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{:#?}", item),
        OutputFormat::Json => print_json(item),
    }
}

/// Print a status line, or `{"status": .., "message": ..}` in JSON mode.
pub fn print_status(status: Status, message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{} {}", status.symbol(), message),
        OutputFormat::Json => print_json(&json!({ "status": status.label(), "message": message })),
    }
}

/// Report a failed command on stderr. JSON mode includes the error kind so
/// scripts can tell a missing key from a storage failure.
pub fn print_error(error: &AppError, format: OutputFormat) {
    match format {
        OutputFormat::Table => eprintln!("✗ {}", error),
        OutputFormat::Json => eprintln!("{}", error_document(error)),
    }
}

fn error_document(error: &AppError) -> Value {
    json!({
        "status": "error",
        "kind": error.kind.to_string(),
        "message": error.message,
    })
}

/// Print an aligned `label: value` line.
pub fn print_kv(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{label}:"), value);
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("✗ Failed to encode output: {e}"),
    }
}
