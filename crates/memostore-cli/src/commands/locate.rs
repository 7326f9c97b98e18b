//! `locate` command.

use serde::Serialize;

use memostore_core::config::StoreConfig;
use memostore_core::error::AppError;
use memostore_core::types::key::canonicalize;
use memostore_storage::providers::FileBackend;

use super::KeyArgs;
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct Location {
    identity: String,
    hash: Option<String>,
    entry_file: Option<String>,
    exists: Option<bool>,
}

/// Print a key's identity and, for the file backend, where it is stored.
pub fn execute(config: &StoreConfig, args: &KeyArgs, format: OutputFormat) -> Result<(), AppError> {
    let identity = canonicalize(&args.parse_key()?);

    let location = if config.backend.provider == "file" {
        let located = FileBackend::from_config(&config.backend.file).locate(&identity);
        Location {
            hash: Some(located.hash),
            exists: Some(located.entry_file.is_file()),
            entry_file: Some(located.entry_file.display().to_string()),
            identity,
        }
    } else {
        Location {
            identity,
            hash: None,
            entry_file: None,
            exists: None,
        }
    };

    match format {
        OutputFormat::Json => output::print_item(&location, format),
        OutputFormat::Table => {
            output::print_kv("Identity", &location.identity);
            output::print_kv("Backend", &config.backend.provider);
            if let (Some(hash), Some(file), Some(exists)) =
                (&location.hash, &location.entry_file, location.exists)
            {
                output::print_kv("Hash", hash);
                output::print_kv("Entry file", file);
                output::print_kv("Exists", if exists { "yes" } else { "no" });
            }
        }
    }

    Ok(())
}
