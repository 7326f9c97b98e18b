//! In-memory backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use memostore_core::config::backend::MemoryBackendConfig;
use memostore_core::error::AppError;
use memostore_core::result::AppResult;
use memostore_core::traits::backend::{Lookup, StorageBackend};
use memostore_core::types::entry::Entry;

/// Process-local backend keyed by identity string.
///
/// In mutable mode the stored value allocation is shared with callers
/// (reads return the same `Arc`). In immutable mode values are deep-copied
/// on both read and write so callers never alias the store's state.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    /// Stored entries by identity.
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    /// Share values instead of copying them.
    mutable: bool,
}

impl MemoryBackend {
    /// Create an in-memory backend from configuration.
    pub fn new(config: &MemoryBackendConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            mutable: config.mutable,
        }
    }

    /// Backend that shares stored values with callers.
    pub fn shared() -> Self {
        Self::new(&MemoryBackendConfig { mutable: true })
    }

    /// Backend that deep-copies values on every read and write.
    pub fn isolated() -> Self {
        Self::new(&MemoryBackendConfig { mutable: false })
    }

    /// Whether stored values are shared with callers.
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the backend holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether an identity is stored.
    pub async fn contains(&self, identity: &str) -> bool {
        self.entries.read().await.contains_key(identity)
    }

    fn detach(&self, entry: &Entry) -> Entry {
        let mut copy = entry.clone();
        if !self.mutable {
            copy.value = Arc::new(Value::clone(&entry.value));
        }
        copy
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::shared()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn backend_type(&self) -> &str {
        "memory"
    }

    async fn get(&self, identity: &str) -> AppResult<Lookup> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(identity) {
            Some(stored) => {
                stored.last_retrieved = Utc::now();
                Ok(Lookup::Hit(self.detach(stored)))
            }
            None => Ok(Lookup::Miss(Map::new())),
        }
    }

    async fn set(&self, identity: &str, entry: &Entry) -> AppResult<()> {
        let stored = self.detach(entry);
        self.entries
            .write()
            .await
            .insert(identity.to_string(), stored);
        debug!(identity, "Stored entry in memory");
        Ok(())
    }

    async fn delete(&self, identity: &str) -> AppResult<()> {
        match self.entries.write().await.remove(identity) {
            Some(_) => Ok(()),
            None => Err(AppError::not_found(
                "The specified key was not found in the store",
            )),
        }
    }

    async fn list(
        &self,
        visit: &mut (dyn FnMut(Option<String>, Entry) + Send),
    ) -> AppResult<usize> {
        let snapshot: Vec<(String, Entry)> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .map(|(identity, entry)| (identity.clone(), self.detach(entry)))
                .collect()
        };

        let count = snapshot.len();
        for (identity, entry) in snapshot {
            visit(Some(identity), entry);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memostore_core::types::entry::GenerationContext;
    use serde_json::json;

    fn entry_for(key: Value, value: Value) -> Entry {
        GenerationContext {
            key,
            create_started: Utc::now(),
            extra: Map::new(),
        }
        .into_entry(value, Utc::now())
    }

    async fn hit(backend: &MemoryBackend, identity: &str) -> Entry {
        match backend.get(identity).await.unwrap() {
            Lookup::Hit(entry) => entry,
            Lookup::Miss(_) => panic!("expected a hit for {identity}"),
        }
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let backend = MemoryBackend::default();
        assert!(matches!(backend.get("k").await.unwrap(), Lookup::Miss(extra) if extra.is_empty()));

        backend
            .set("k", &entry_for(json!("k"), json!({"v": 1})))
            .await
            .unwrap();
        assert!(backend.contains("k").await);
        assert_eq!(*hit(&backend, "k").await.value, json!({"v": 1}));

        backend.delete("k").await.unwrap();
        assert!(backend.is_empty().await);
        assert!(backend.delete("k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_shared_mode_aliases_values() {
        let backend = MemoryBackend::shared();
        let entry = entry_for(json!("k"), json!({"v": 1}));
        backend.set("k", &entry).await.unwrap();

        let first = hit(&backend, "k").await;
        let second = hit(&backend, "k").await;
        assert!(Arc::ptr_eq(&first.value, &entry.value));
        assert!(Arc::ptr_eq(&first.value, &second.value));
    }

    #[tokio::test]
    async fn test_isolated_mode_copies_values() {
        let backend = MemoryBackend::isolated();
        let entry = entry_for(json!("k"), json!({"v": 1}));
        backend.set("k", &entry).await.unwrap();

        let first = hit(&backend, "k").await;
        let second = hit(&backend, "k").await;
        assert!(!Arc::ptr_eq(&first.value, &entry.value));
        assert!(!Arc::ptr_eq(&first.value, &second.value));
        assert_eq!(first.value, second.value);
    }

    #[tokio::test]
    async fn test_get_refreshes_last_retrieved() {
        let backend = MemoryBackend::default();
        let mut entry = entry_for(json!("k"), json!(1));
        entry.last_retrieved = Utc::now() - chrono::Duration::hours(1);
        backend.set("k", &entry).await.unwrap();

        let before = Utc::now();
        assert!(hit(&backend, "k").await.last_retrieved >= before);

        let mut listed = Vec::new();
        backend
            .list(&mut |_: Option<String>, e: Entry| listed.push(e))
            .await
            .unwrap();
        assert!(listed[0].last_retrieved >= before);
    }

    #[tokio::test]
    async fn test_list_reports_identities() {
        let backend = MemoryBackend::isolated();
        backend.set("a", &entry_for(json!("a"), json!(1))).await.unwrap();
        backend.set("b", &entry_for(json!("b"), json!(2))).await.unwrap();

        let mut seen = Vec::new();
        let count = backend
            .list(&mut |identity: Option<String>, entry: Entry| {
                seen.push((identity.unwrap(), entry.key.clone()));
            })
            .await
            .unwrap();
        seen.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(count, 2);
        assert_eq!(
            seen,
            vec![("a".to_string(), json!("a")), ("b".to_string(), json!("b"))]
        );
    }
}
