//! Configuration schemas.
//!
//! All configuration structs are deserialized from an optional TOML file
//! via the `config` crate, overlaid with `MEMOSTORE__*` environment
//! variables. Each sub-module represents a logical configuration section.

pub mod backend;
pub mod coordinator;
pub mod logging;

use serde::{Deserialize, Serialize};

use self::backend::BackendConfig;
use self::coordinator::CoordinatorConfig;
use self::logging::LoggingConfig;

use crate::error::AppError;

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "MEMOSTORE";

/// Root memostore configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage backend selection and settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Request coordinator settings.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StoreConfig {
    /// Load configuration from a TOML file and the environment.
    ///
    /// The file is optional; a missing file yields the defaults overlaid
    /// with any `MEMOSTORE__SECTION__FIELD` environment variables.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        tracing::debug!(
            path,
            provider = %loaded.backend.provider,
            "Loaded memostore configuration"
        );
        Ok(loaded)
    }
}
