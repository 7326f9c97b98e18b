//! # memostore-core
//!
//! Core crate for memostore. Contains the storage-backend and generator
//! traits, the persisted [`Entry`](types::entry::Entry) record, the key
//! canonicalizer, configuration schemas and the unified error system.
//!
//! This crate has **no** internal dependencies on other memostore crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
