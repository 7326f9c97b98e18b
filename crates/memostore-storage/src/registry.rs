//! Backend registry constructing storage backends by name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use memostore_core::config::backend::BackendConfig;
use memostore_core::error::AppError;
use memostore_core::result::AppResult;
use memostore_core::traits::backend::StorageBackend;

/// Constructor for a named backend.
pub type BackendFactory = fn(&BackendConfig) -> AppResult<Arc<dyn StorageBackend>>;

/// Named set of backend constructors.
///
/// [`BackendRegistry::builtin`] knows the backends compiled into this
/// crate; applications may register their own under additional names.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    /// Map of backend name → constructor.
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with the built-in backends.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        #[cfg(feature = "file")]
        registry.register("file", |config| {
            let backend: Arc<dyn StorageBackend> =
                Arc::new(crate::providers::FileBackend::from_config(&config.file));
            Ok(backend)
        });
        #[cfg(feature = "memory")]
        registry.register("memory", |config| {
            let backend: Arc<dyn StorageBackend> =
                Arc::new(crate::providers::MemoryBackend::new(&config.memory));
            Ok(backend)
        });
        registry
    }

    /// Register a constructor, replacing any previous one with that name.
    pub fn register(&mut self, name: impl Into<String>, factory: BackendFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Whether a backend name is known.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered backend names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the backend selected by `config.provider`.
    pub fn build(&self, config: &BackendConfig) -> AppResult<Arc<dyn StorageBackend>> {
        let factory = self.factories.get(&config.provider).ok_or_else(|| {
            AppError::configuration(format!(
                "Unknown storage backend: '{}'. Supported: {}",
                config.provider,
                self.names().join(", ")
            ))
        })?;

        info!(backend = %config.provider, "Initializing storage backend");
        factory(config)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}
