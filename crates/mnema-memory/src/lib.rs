//! Per-user long-term memory storage and similarity retrieval for Mnema.

pub mod error;
pub mod model;
pub mod provider;
pub mod similarity;

/// Memory error type.
pub use error::MemoryError;
/// Memory record and retrieval models.
pub use model::{MEMORIES_NAMESPACE, MemoryRecord, Namespace, SearchHit};
/// Memory store interface and bundled implementations.
pub use provider::{FileMemoryStore, InMemoryStore, MemoryStore};
/// Similarity scoring and key derivation helpers.
pub use similarity::{derive_key, similarity, tokenize};
