//! Storage backend trait for pluggable entry stores.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::result::AppResult;
use crate::types::entry::Entry;

/// Outcome of a backend lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The backend holds an entry for the identity.
    Hit(Entry),
    /// Nothing stored yet. Carries backend-chosen metadata a generator may
    /// want, such as a reserved storage path.
    Miss(Map<String, Value>),
}

/// Trait for entry storage backends.
///
/// Implementations exist for the local filesystem and for process memory.
/// The coordinator serializes all operations on one identity, so a backend
/// only has to be safe across *different* identities.
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug + 'static {
    /// Return the backend type name (e.g., "file", "memory").
    fn backend_type(&self) -> &str;

    /// Whether the coordinator may keep a front cache in front of this
    /// backend.
    fn supports_front_cache(&self) -> bool {
        true
    }

    /// Look up the entry for an identity. A miss is not an error.
    async fn get(&self, identity: &str) -> AppResult<Lookup>;

    /// Persist or overwrite the entry for an identity.
    async fn set(&self, identity: &str, entry: &Entry) -> AppResult<()>;

    /// Remove the entry for an identity. Returns a `NotFound` error if
    /// nothing was stored.
    async fn delete(&self, identity: &str) -> AppResult<()>;

    /// Enumerate all stored entries in unspecified order and return how
    /// many were visited. Entries that cannot be read mid-enumeration are
    /// skipped.
    ///
    /// `visit` receives the identity when the backend can recover it and
    /// `None` otherwise (the file backend only knows the hash); callers use
    /// the key stored inside the entry.
    async fn list(&self, visit: &mut (dyn FnMut(Option<String>, Entry) + Send)) -> AppResult<usize>;
}
