//! Keyed memoization cache.
//!
//! A [`ResourceStore`] coordinates requests per key: the first request for a
//! missing key runs the generator, concurrent requests for the same key wait
//! for that result, and deletes are ordered against gets. Entries persist in
//! a [`StorageBackend`], either the MD5-sharded [`FileBackend`] or the
//! process-local [`MemoryBackend`].

pub use memostore_core::config::StoreConfig;
pub use memostore_core::error::{AppError, ErrorKind};
pub use memostore_core::result::AppResult;
pub use memostore_core::traits::backend::{Lookup, StorageBackend};
pub use memostore_core::traits::generator::Generator;
pub use memostore_core::types::entry::{Entry, GenerationContext, STORAGE_PATH};
pub use memostore_core::types::key::{Key, canonicalize, identity_of};
pub use memostore_storage::BackendRegistry;
pub use memostore_storage::providers::{EntryLocation, FileBackend, MemoryBackend};
pub use memostore_store::ResourceStore;
