//! Memory store interface and bundled implementations.

mod file;
mod in_memory;

pub use file::FileMemoryStore;
pub use in_memory::InMemoryStore;

use crate::error::MemoryError;
use crate::model::{MemoryRecord, Namespace, SearchHit};
use crate::similarity::{derive_key, similarity};
use async_trait::async_trait;

#[async_trait]
/// Namespaced key/value memory with similarity search.
pub trait MemoryStore: Send + Sync {
    /// Rank every record of `namespace` against `query`.
    ///
    /// Results are ordered by score descending, ties going to the most
    /// recently written record. Zero-score records are still candidates.
    async fn search(
        &self,
        namespace: &Namespace,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, MemoryError>;

    /// Insert or overwrite a record, returning the confirmation text.
    ///
    /// When `key` is absent the key is derived from the content.
    async fn upsert(
        &self,
        namespace: &Namespace,
        key: Option<&str>,
        value: &str,
    ) -> Result<String, MemoryError>;

    /// Fetch a single record by key.
    async fn get(
        &self,
        namespace: &Namespace,
        key: &str,
    ) -> Result<Option<MemoryRecord>, MemoryError>;

    /// Remove a record, reporting whether it existed.
    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool, MemoryError>;

    /// All records of a namespace, oldest first.
    async fn list(&self, namespace: &Namespace) -> Result<Vec<MemoryRecord>, MemoryError>;
}

/// Confirmation text returned by a successful upsert.
pub(crate) fn confirmation(key: &str) -> String {
    format!("Stored memory {key}")
}

/// Validate upsert input and resolve the record key.
pub(crate) fn resolve_key(key: Option<&str>, value: &str) -> Result<String, MemoryError> {
    if value.trim().is_empty() {
        return Err(MemoryError::InvalidRecord(
            "memory content must not be empty".to_string(),
        ));
    }
    match key.map(str::trim) {
        Some("") => Err(MemoryError::InvalidRecord(
            "memory key must not be empty".to_string(),
        )),
        Some(key) => Ok(key.to_string()),
        None => Ok(derive_key(value)),
    }
}

/// Score and order records for a query.
pub(crate) fn rank<'a>(
    records: impl IntoIterator<Item = &'a MemoryRecord>,
    query: &str,
    limit: usize,
) -> Vec<SearchHit> {
    let mut scored = records
        .into_iter()
        .map(|record| (similarity(query, &record.searchable_text()), record))
        .collect::<Vec<_>>();
    scored.sort_by(|(left_score, left), (right_score, right)| {
        right_score
            .total_cmp(left_score)
            .then_with(|| right.updated_at.cmp(&left.updated_at))
            .then_with(|| left.key.cmp(&right.key))
    });
    scored
        .into_iter()
        .take(limit)
        .map(|(score, record)| SearchHit {
            key: record.key.clone(),
            value: record.value.clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{rank, resolve_key};
    use crate::model::{MemoryRecord, Namespace};
    use crate::similarity::derive_key;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn resolve_key_derives_when_missing() {
        assert_eq!(
            resolve_key(None, "likes blue").expect("key"),
            derive_key("likes blue")
        );
        assert_eq!(resolve_key(Some(" color "), "blue").expect("key"), "color");
        assert!(resolve_key(Some("  "), "blue").is_err());
        assert!(resolve_key(None, "   ").is_err());
    }

    #[test]
    fn rank_breaks_ties_by_recency() {
        let namespace = Namespace::memories("u1");
        let mut older = MemoryRecord::new(namespace.clone(), "a", "pizza");
        older.updated_at = Utc::now() - Duration::seconds(10);
        let newer = MemoryRecord::new(namespace.clone(), "b", "pizza");
        let unrelated = MemoryRecord::new(namespace, "c", "mountains");

        let hits = rank([&older, &unrelated, &newer], "pizza", 10);
        let keys = hits.iter().map(|hit| hit.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(hits[2].score, 0.0);
    }

    #[test]
    fn rank_respects_limit() {
        let namespace = Namespace::memories("u1");
        let records = (0..5)
            .map(|idx| MemoryRecord::new(namespace.clone(), format!("k{idx}"), "fact"))
            .collect::<Vec<_>>();
        assert_eq!(rank(&records, "fact", 2).len(), 2);
        assert!(rank(&records, "fact", 0).is_empty());
    }
}
