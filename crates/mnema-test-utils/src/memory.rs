use async_trait::async_trait;
use mnema_memory::{InMemoryStore, MemoryError, MemoryRecord, MemoryStore, Namespace, SearchHit};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Store whose every operation fails as unavailable.
#[derive(Clone, Default)]
pub struct FailingMemoryStore;

impl FailingMemoryStore {
    pub fn new() -> Self {
        Self
    }

    fn unavailable() -> MemoryError {
        MemoryError::Unavailable("backend offline".to_string())
    }
}

#[async_trait]
impl MemoryStore for FailingMemoryStore {
    async fn search(
        &self,
        _namespace: &Namespace,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        Err(Self::unavailable())
    }

    async fn upsert(
        &self,
        _namespace: &Namespace,
        _key: Option<&str>,
        _value: &str,
    ) -> Result<String, MemoryError> {
        Err(Self::unavailable())
    }

    async fn get(
        &self,
        _namespace: &Namespace,
        _key: &str,
    ) -> Result<Option<MemoryRecord>, MemoryError> {
        Err(Self::unavailable())
    }

    async fn delete(&self, _namespace: &Namespace, _key: &str) -> Result<bool, MemoryError> {
        Err(Self::unavailable())
    }

    async fn list(&self, _namespace: &Namespace) -> Result<Vec<MemoryRecord>, MemoryError> {
        Err(Self::unavailable())
    }
}

/// In-memory store that delays upserts per value and records completion order.
///
/// Used to force tool calls to finish out of order.
#[derive(Clone, Default)]
pub struct DelayedMemoryStore {
    inner: InMemoryStore,
    delays: Arc<HashMap<String, Duration>>,
    completed: Arc<Mutex<Vec<String>>>,
}

impl DelayedMemoryStore {
    /// `delays` maps memory content to how long its upsert sleeps.
    pub fn new(delays: impl IntoIterator<Item = (String, Duration)>) -> Self {
        Self {
            inner: InMemoryStore::new(),
            delays: Arc::new(delays.into_iter().collect()),
            completed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Values in the order their upserts finished.
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().clone()
    }
}

#[async_trait]
impl MemoryStore for DelayedMemoryStore {
    async fn search(
        &self,
        namespace: &Namespace,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        self.inner.search(namespace, query, limit).await
    }

    async fn upsert(
        &self,
        namespace: &Namespace,
        key: Option<&str>,
        value: &str,
    ) -> Result<String, MemoryError> {
        if let Some(delay) = self.delays.get(value) {
            tokio::time::sleep(*delay).await;
        }
        let confirmation = self.inner.upsert(namespace, key, value).await?;
        self.completed.lock().push(value.to_string());
        Ok(confirmation)
    }

    async fn get(
        &self,
        namespace: &Namespace,
        key: &str,
    ) -> Result<Option<MemoryRecord>, MemoryError> {
        self.inner.get(namespace, key).await
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool, MemoryError> {
        self.inner.delete(namespace, key).await
    }

    async fn list(&self, namespace: &Namespace) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.inner.list(namespace).await
    }
}
