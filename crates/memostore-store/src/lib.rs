//! # memostore-store
//!
//! The request coordinator. [`ResourceStore`] sits above a storage backend
//! and a caller-supplied generator and guarantees that operations on one key
//! run one at a time in submission order, so concurrent requests for a
//! missing key trigger a single generation.
//!
//! Operations on different keys never wait on each other.

pub mod coordinator;
mod slots;

pub use coordinator::ResourceStore;
