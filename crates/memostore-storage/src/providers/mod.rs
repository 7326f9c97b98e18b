//! Storage backend implementations.

#[cfg(feature = "file")]
pub mod file;
#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "file")]
pub use file::{EntryLocation, FileBackend};
#[cfg(feature = "memory")]
pub use memory::MemoryBackend;
