//! Process-local memory store.

use super::{MemoryStore, confirmation, rank, resolve_key};
use crate::error::MemoryError;
use crate::model::{MemoryRecord, Namespace, SearchHit};
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

type Records = HashMap<Namespace, HashMap<String, MemoryRecord>>;

/// Memory store kept entirely in memory; contents are lost on drop.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<Records>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn search(
        &self,
        namespace: &Namespace,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        let records = self.records.read();
        let hits = records
            .get(namespace)
            .map(|entries| rank(entries.values(), query, limit))
            .unwrap_or_default();
        debug!(
            "searched memories (namespace={}, query_len={}, returned={})",
            namespace,
            query.len(),
            hits.len()
        );
        Ok(hits)
    }

    async fn upsert(
        &self,
        namespace: &Namespace,
        key: Option<&str>,
        value: &str,
    ) -> Result<String, MemoryError> {
        let key = resolve_key(key, value)?;
        let value = value.trim();
        let mut records = self.records.write();
        let entries = records.entry(namespace.clone()).or_default();
        match entries.get_mut(&key) {
            Some(existing) => existing.overwrite(value),
            None => {
                entries.insert(
                    key.clone(),
                    MemoryRecord::new(namespace.clone(), key.clone(), value),
                );
            }
        }
        debug!(
            "stored memory record (namespace={}, key={}, value_len={})",
            namespace,
            key,
            value.len()
        );
        Ok(confirmation(&key))
    }

    async fn get(
        &self,
        namespace: &Namespace,
        key: &str,
    ) -> Result<Option<MemoryRecord>, MemoryError> {
        Ok(self
            .records
            .read()
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool, MemoryError> {
        let mut records = self.records.write();
        Ok(records
            .get_mut(namespace)
            .and_then(|entries| entries.remove(key))
            .is_some())
    }

    async fn list(&self, namespace: &Namespace) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut records = self
            .records
            .read()
            .get(namespace)
            .map(|entries| entries.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        records.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(records)
    }
}
