//! CLI command definitions and dispatch.

pub mod config;
pub mod delete;
pub mod list;
pub mod locate;
pub mod show;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use memostore_core::config::StoreConfig;
use memostore_core::error::{AppError, ErrorKind};
use memostore_core::result::AppResult;
use memostore_core::types::entry::GenerationContext;
use memostore_core::types::key::canonicalize;
use memostore_storage::BackendRegistry;
use memostore_store::ResourceStore;

use crate::output::OutputFormat;

/// memostore command-line interface
#[derive(Debug, Parser)]
#[command(name = "memostore", version, about = "Inspect and manage a memostore cache", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/memostore.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List every stored entry
    List,
    /// Show the stored entry for a key
    Show(KeyArgs),
    /// Delete the stored entry for a key
    Delete(KeyArgs),
    /// Print the identity and storage location of a key
    Locate(KeyArgs),
    /// Show the effective configuration
    Config,
}

/// A key given on the command line.
#[derive(Debug, Args)]
pub struct KeyArgs {
    /// Key as JSON, e.g. '{"id":1}' or '"name"'
    pub key: String,

    /// Treat the argument as a plain string instead of JSON
    #[arg(long)]
    pub string: bool,
}

impl KeyArgs {
    /// Parse the key argument into a JSON value.
    pub fn parse_key(&self) -> Result<Value, AppError> {
        if self.string {
            return Ok(Value::String(self.key.clone()));
        }
        serde_json::from_str(&self.key).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Key is not valid JSON (use --string for plain strings): {e}"),
                e,
            )
        })
    }
}

impl Cli {
    /// Execute the selected command
    pub async fn execute(&self, settings: &StoreConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::List => list::execute(&open_store(settings)?, self.format).await,
            Commands::Show(args) => show::execute(&open_store(settings)?, args, self.format).await,
            Commands::Delete(args) => delete::execute(&open_store(settings)?, args, self.format).await,
            Commands::Locate(args) => locate::execute(settings, args, self.format),
            Commands::Config => config::execute(settings, self.format),
        }
    }
}

/// Open the configured store. The CLI only inspects stored entries, so
/// its generator refuses to produce values.
pub fn open_store(config: &StoreConfig) -> Result<ResourceStore, AppError> {
    tracing::debug!(provider = %config.backend.provider, "Opening store");
    ResourceStore::from_config(config, &BackendRegistry::builtin(), refuse_generation)
}

async fn refuse_generation(key: Value, _context: GenerationContext) -> AppResult<Value> {
    Err(AppError::not_found(format!(
        "No entry stored for key {}",
        canonicalize(&key)
    )))
}
