//! Shared domain types.

pub mod entry;
pub mod key;

pub use entry::{Entry, GenerationContext};
pub use key::{Key, canonicalize, identity_of};
