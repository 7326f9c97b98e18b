//! Storage backend configuration.

use serde::{Deserialize, Serialize};

/// Top-level backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend name registered with the backend registry: `"file"` or
    /// `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// File backend configuration.
    #[serde(default)]
    pub file: FileBackendConfig,
    /// In-memory backend configuration.
    #[serde(default)]
    pub memory: MemoryBackendConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            file: FileBackendConfig::default(),
            memory: MemoryBackendConfig::default(),
        }
    }
}

/// Hash-sharded file backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBackendConfig {
    /// Root directory holding the shard tree.
    #[serde(default = "default_root_path")]
    pub root_path: String,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
        }
    }
}

/// In-memory backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBackendConfig {
    /// Share stored values with callers instead of deep-copying them on
    /// every read and write.
    #[serde(default = "default_true")]
    pub mutable: bool,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self {
            mutable: default_true(),
        }
    }
}

fn default_provider() -> String {
    "file".to_string()
}

fn default_root_path() -> String {
    "./data/memostore".to_string()
}

fn default_true() -> bool {
    true
}
