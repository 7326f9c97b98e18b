//! `list` command.

use serde::Serialize;
use tabled::Tabled;

use memostore_core::error::AppError;
use memostore_core::types::key::canonicalize;
use memostore_store::ResourceStore;

use crate::output::{self, OutputFormat};

/// Table row for a stored entry.
#[derive(Debug, Serialize, Tabled)]
struct EntryRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Generation (ms)")]
    generation_ms: i64,
    #[tabled(rename = "Last Retrieved")]
    last_retrieved: String,
}

/// List every stored entry.
pub async fn execute(store: &ResourceStore, format: OutputFormat) -> Result<(), AppError> {
    let mut rows = Vec::new();
    let count = store
        .list(|key, _value, entry| {
            rows.push(EntryRow {
                key: canonicalize(key),
                created: entry.create_ended.format("%Y-%m-%d %H:%M:%S").to_string(),
                generation_ms: (entry.create_ended - entry.create_started).num_milliseconds(),
                last_retrieved: entry.last_retrieved.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
        })
        .await?;

    rows.sort_by(|a, b| a.key.cmp(&b.key));
    output::print_list(&rows, format);

    if format == OutputFormat::Table {
        println!();
        output::print_kv("Total", &count.to_string());
    }

    Ok(())
}
