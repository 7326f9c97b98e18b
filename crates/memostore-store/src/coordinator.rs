//! Per-key request coordination above a storage backend.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use memostore_core::config::StoreConfig;
use memostore_core::config::coordinator::CoordinatorConfig;
use memostore_core::error::{AppError, ErrorKind};
use memostore_core::result::AppResult;
use memostore_core::traits::backend::{Lookup, StorageBackend};
use memostore_core::traits::generator::Generator;
use memostore_core::types::entry::{Entry, GenerationContext};
use memostore_core::types::key::canonicalize;
use memostore_storage::BackendRegistry;
use memostore_storage::providers::{FileBackend, MemoryBackend};

use crate::slots::{Operation, SlotTable, Started, Task};

/// Keyed memoization cache.
///
/// Every `get`/`delete` is queued per key identity and executed one at a
/// time in submission order. A `get` that misses the backend invokes the
/// generator, persists the result and answers every request queued behind
/// it from that single generation. Different keys are fully independent.
///
/// Requests are queued when the method is called, not when the returned
/// future is first polled; each key's queue is driven by a task spawned on
/// the current Tokio runtime, so the methods must be called from within one.
#[derive(Clone)]
pub struct ResourceStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Arc<dyn StorageBackend>,
    generator: Arc<dyn Generator>,
    slots: SlotTable,
    front_cache: bool,
}

impl ResourceStore {
    /// Create a store over an explicit backend with default coordinator
    /// settings.
    pub fn new(backend: Arc<dyn StorageBackend>, generator: impl Generator) -> Self {
        Self::with_options(backend, generator, &CoordinatorConfig::default())
    }

    /// Create a store over an explicit backend.
    ///
    /// The front cache is enabled only if both the configuration and the
    /// backend allow it.
    pub fn with_options(
        backend: Arc<dyn StorageBackend>,
        generator: impl Generator,
        config: &CoordinatorConfig,
    ) -> Self {
        let front_cache = config.front_cache && backend.supports_front_cache();
        debug!(
            backend = backend.backend_type(),
            front_cache, "Creating resource store"
        );
        Self {
            inner: Arc::new(StoreInner {
                backend,
                generator: Arc::new(generator),
                slots: SlotTable::default(),
                front_cache,
            }),
        }
    }

    /// Create a store backed by a shared-value in-memory backend.
    pub fn in_memory(generator: impl Generator) -> Self {
        Self::new(Arc::new(MemoryBackend::shared()), generator)
    }

    /// Create a store backed by a file backend rooted at `root`.
    pub fn in_directory(root: impl Into<PathBuf>, generator: impl Generator) -> Self {
        Self::new(Arc::new(FileBackend::new(root)), generator)
    }

    /// Create a store from configuration, constructing the backend through
    /// the registry.
    pub fn from_config(
        config: &StoreConfig,
        registry: &BackendRegistry,
        generator: impl Generator,
    ) -> AppResult<Self> {
        let backend = registry.build(&config.backend)?;
        Ok(Self::with_options(backend, generator, &config.coordinator))
    }

    /// The underlying storage backend.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.inner.backend
    }

    /// Whether freshly generated entries are served from memory while
    /// their key still has queued requests.
    pub fn front_cache_enabled(&self) -> bool {
        self.inner.front_cache
    }

    /// Number of keys with queued or running operations.
    pub fn pending_keys(&self) -> usize {
        self.inner.slots.active()
    }

    /// Start time of the operation currently running for `key`, if any.
    pub fn running_since<K: Serialize + ?Sized>(&self, key: &K) -> AppResult<Option<DateTime<Utc>>> {
        let key = serde_json::to_value(key)?;
        Ok(self.inner.slots.running_since(&canonicalize(&key)))
    }

    /// Return the entry for `key`, generating and persisting it first if
    /// the backend does not hold it.
    ///
    /// The entry carries the value, its creation timestamps and whether it
    /// was already stored (`was_cached`).
    pub fn get<K: Serialize + ?Sized>(
        &self,
        key: &K,
    ) -> impl Future<Output = AppResult<Entry>> + Send + 'static {
        let submitted = serde_json::to_value(key).map_err(AppError::from).map(|key| {
            let (tx, rx) = oneshot::channel();
            self.submit(key, Operation::Get(tx));
            rx
        });

        async move {
            submitted?
                .await
                .map_err(|_| AppError::internal("Request coordinator dropped the response"))?
        }
    }

    /// Return the value for `key` deserialized into `T`.
    pub fn get_as<T, K>(&self, key: &K) -> impl Future<Output = AppResult<T>> + Send + 'static
    where
        T: DeserializeOwned,
        K: Serialize + ?Sized,
    {
        let entry = self.get(key);
        async move {
            let entry = entry.await?;
            Ok(T::deserialize(&*entry.value)?)
        }
    }

    /// Remove the entry for `key`. Fails with a `NotFound` error when
    /// nothing is stored.
    pub fn delete<K: Serialize + ?Sized>(
        &self,
        key: &K,
    ) -> impl Future<Output = AppResult<()>> + Send + 'static {
        let submitted = serde_json::to_value(key).map_err(AppError::from).map(|key| {
            let (tx, rx) = oneshot::channel();
            self.submit(key, Operation::Delete(Some(tx)));
            rx
        });

        async move {
            submitted?
                .await
                .map_err(|_| AppError::internal("Request coordinator dropped the response"))?
        }
    }

    /// Queue a delete for `key` without waiting for its outcome. Ordering
    /// relative to other operations on the key is the same as [`delete`].
    ///
    /// [`delete`]: Self::delete
    pub fn delete_detached<K: Serialize + ?Sized>(&self, key: &K) -> AppResult<()> {
        let key = serde_json::to_value(key)?;
        self.submit(key, Operation::Delete(None));
        Ok(())
    }

    /// Enumerate all stored entries and return how many were visited.
    ///
    /// `visit` receives each entry's original key and value alongside the
    /// entry. Enumeration bypasses the per-key queues and reflects whatever
    /// the backend holds while it runs.
    pub async fn list<F>(&self, mut visit: F) -> AppResult<usize>
    where
        F: FnMut(&Value, &Value, &Entry) + Send,
    {
        self.inner
            .backend
            .list(&mut |_identity: Option<String>, entry: Entry| {
                visit(&entry.key, &*entry.value, &entry)
            })
            .await
    }

    fn submit(&self, key: Value, op: Operation) {
        let identity = canonicalize(&key);
        debug!(identity = %identity, op = op.name(), "Queued operation");
        if self.inner.slots.enqueue(&identity, Task { key, op }) {
            tokio::spawn(run_queue(self.inner.clone(), identity));
        }
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore")
            .field("backend", &self.inner.backend)
            .field("front_cache", &self.inner.front_cache)
            .field("pending_keys", &self.inner.slots.active())
            .finish()
    }
}

/// Drain one identity's queue. Runs until the queue is empty, at which
/// point the slot is torn down.
async fn run_queue(inner: Arc<StoreInner>, identity: String) {
    while let Some(Started {
        task,
        started_at,
        front,
    }) = inner.slots.begin_next(&identity)
    {
        match task.op {
            Operation::Get(reply) => {
                let result = isolate(execute_get(
                    inner.clone(),
                    identity.clone(),
                    task.key,
                    started_at,
                    front,
                ))
                .await;
                let _ = reply.send(result);
            }
            Operation::Delete(reply) => {
                let result = isolate(execute_delete(inner.clone(), identity.clone())).await;
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            debug!(identity = %identity, error = %e, "Detached delete failed");
                        }
                    }
                }
            }
        }
    }
    debug!(identity = %identity, "Queue drained");
}

/// Run one task on its own Tokio task so a panic fails that task only and
/// the queue keeps advancing.
async fn isolate<T, F>(work: F) -> AppResult<T>
where
    T: Send + 'static,
    F: Future<Output = AppResult<T>> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "Coordinator task panicked");
            Err(AppError::with_source(
                ErrorKind::Internal,
                "Coordinator task panicked",
                e,
            ))
        }
    }
}

async fn execute_get(
    inner: Arc<StoreInner>,
    identity: String,
    key: Value,
    started_at: DateTime<Utc>,
    front: Option<Entry>,
) -> AppResult<Entry> {
    if let Some(entry) = front {
        debug!(identity = %identity, "Served from front cache");
        return Ok(entry);
    }

    let extra = match inner.backend.get(&identity).await? {
        Lookup::Hit(mut entry) => {
            entry.was_cached = true;
            return Ok(entry);
        }
        Lookup::Miss(extra) => extra,
    };

    debug!(identity = %identity, "Miss, generating value");
    let context = GenerationContext {
        key: key.clone(),
        create_started: started_at,
        extra,
    };

    let generator = inner.generator.clone();
    let generation = {
        let context = context.clone();
        tokio::spawn(async move { generator.generate(key, context).await })
    };
    let value = match generation.await {
        Ok(result) => result?,
        Err(e) => {
            warn!(identity = %identity, error = %e, "Generator panicked");
            return Err(AppError::with_source(
                ErrorKind::Generation,
                "Generator panicked",
                e,
            ));
        }
    };

    let entry = context.into_entry(value, Utc::now());
    inner.backend.set(&identity, &entry).await?;

    if inner.front_cache {
        inner.slots.cache(&identity, entry.clone());
    }
    Ok(entry)
}

async fn execute_delete(inner: Arc<StoreInner>, identity: String) -> AppResult<()> {
    let result = inner.backend.delete(&identity).await;
    inner.slots.evict(&identity);
    result
}
