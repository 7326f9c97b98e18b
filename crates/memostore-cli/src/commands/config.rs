//! `config` command.

use memostore_core::config::StoreConfig;
use memostore_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Show the effective configuration after file and environment overrides.
pub fn execute(config: &StoreConfig, format: OutputFormat) -> Result<(), AppError> {
    match format {
        OutputFormat::Json => output::print_item(config, format),
        OutputFormat::Table => {
            output::print_kv("Backend", &config.backend.provider);
            output::print_kv("File root", &config.backend.file.root_path);
            output::print_kv("Memory mutable", &config.backend.memory.mutable.to_string());
            output::print_kv("Front cache", &config.coordinator.front_cache.to_string());
            output::print_kv("Log level", &config.logging.level);
            output::print_kv("Log format", &config.logging.format);
        }
    }
    Ok(())
}
