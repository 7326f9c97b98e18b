//! Request coordinator configuration.

use serde::{Deserialize, Serialize};

/// Settings for the per-key request coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Keep the most recently generated entry of a key in memory while
    /// requests for that key are still queued.
    #[serde(default = "default_front_cache")]
    pub front_cache: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            front_cache: default_front_cache(),
        }
    }
}

fn default_front_cache() -> bool {
    true
}
