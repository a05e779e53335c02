//! Memory records, namespaces, and retrieval hits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection name used for user memories.
pub const MEMORIES_NAMESPACE: &str = "memories";

/// Partition of the memory store, keyed by user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    pub user_id: String,
    pub collection: String,
}

impl Namespace {
    /// Namespace holding the memories of `user_id`.
    pub fn memories(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            collection: MEMORIES_NAMESPACE.to_string(),
        }
    }

    /// Filesystem-safe stem identifying this namespace.
    pub fn file_stem(&self) -> String {
        format!(
            "{}-{}",
            self.collection,
            hex::encode(self.user_id.as_bytes())
        )
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.user_id, self.collection)
    }
}

/// Persisted memory record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub namespace: Namespace,
    /// Unique within the namespace; upserts overwrite by key.
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Create a fresh record stamped with the current time.
    pub fn new(namespace: Namespace, key: impl Into<String>, value: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            namespace,
            key: key.into(),
            value: value.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the value, keeping the original creation time.
    pub fn overwrite(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.updated_at = Utc::now();
    }

    /// Text scored against retrieval queries.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.key, self.value)
    }
}

/// Ranked search result surfaced to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub key: String,
    pub value: String,
    /// Similarity in `[0, 1]`.
    pub score: f32,
}
