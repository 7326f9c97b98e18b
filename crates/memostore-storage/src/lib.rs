//! # memostore-storage
//!
//! Storage backend implementations for memostore:
//!
//! - **file**: durable, content-addressed entries in a two-level hash-sharded
//!   directory tree
//! - **memory**: process-local map, sharing or deep-copying stored values
//!
//! Backends are constructed by name through the [`BackendRegistry`].

pub mod providers;
pub mod registry;

pub use registry::BackendRegistry;
