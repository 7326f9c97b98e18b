//! Core traits defined in `memostore-core` and implemented by other crates.

pub mod backend;
pub mod generator;

pub use backend::{Lookup, StorageBackend};
pub use generator::Generator;
