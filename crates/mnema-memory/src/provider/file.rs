//! File-backed memory store persisting one JSONL file per namespace.

use super::{MemoryStore, confirmation, rank, resolve_key};
use crate::error::MemoryError;
use crate::model::{MemoryRecord, Namespace, SearchHit};
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tempfile::NamedTempFile;

/// Write locks per namespace file, shared by every store in the process.
static FILE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn file_lock(path: &Path) -> Arc<Mutex<()>> {
    FILE_LOCKS
        .lock()
        .entry(path.to_path_buf())
        .or_default()
        .clone()
}

/// File-backed memory store.
///
/// Each namespace is a JSONL file under `root`. Writes rewrite the whole
/// namespace file through a unique temp file and rename. Read-modify-write
/// cycles hold a lock keyed by the canonical file path, so stores opened on
/// the same root never lose each other's updates.
#[derive(Debug, Clone)]
pub struct FileMemoryStore {
    root: PathBuf,
    lock_root: PathBuf,
}

impl FileMemoryStore {
    /// Create a new file-backed store under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        let lock_root = root.canonicalize()?;
        info!("initialized file memory store (root={})", root.display());
        Ok(Self { root, lock_root })
    }

    /// Root directory holding namespace files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_path(&self, namespace: &Namespace) -> PathBuf {
        self.root.join(format!("{}.jsonl", namespace.file_stem()))
    }

    fn write_lock(&self, namespace: &Namespace) -> Arc<Mutex<()>> {
        file_lock(&self.lock_root.join(format!("{}.jsonl", namespace.file_stem())))
    }

    /// Load all records of a namespace in file order.
    fn load_records(&self, namespace: &Namespace) -> Result<Vec<MemoryRecord>, MemoryError> {
        let path = self.namespace_path(namespace);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = OpenOptions::new().read(true).open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: MemoryRecord = serde_json::from_str(&line)?;
            records.push(record);
        }
        Ok(records)
    }

    /// Rewrite a namespace's records atomically.
    fn write_records(
        &self,
        namespace: &Namespace,
        records: &[MemoryRecord],
    ) -> Result<(), MemoryError> {
        let mut file = NamedTempFile::new_in(&self.root)?;
        for record in records {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{line}")?;
        }
        file.as_file().sync_all()?;
        file.persist(self.namespace_path(namespace))
            .map_err(std::io::Error::from)?;
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    async fn search(
        &self,
        namespace: &Namespace,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        let records = self.load_records(namespace)?;
        let hits = rank(&records, query, limit);
        debug!(
            "searched memories (namespace={}, candidates={}, returned={})",
            namespace,
            records.len(),
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
        let lock = self.write_lock(namespace);
        let _guard = lock.lock();
        let mut records = self.load_records(namespace)?;
        match records.iter_mut().find(|record| record.key == key) {
            Some(existing) => existing.overwrite(value),
            None => records.push(MemoryRecord::new(namespace.clone(), key.clone(), value)),
        }
        self.write_records(namespace, &records)?;
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
            .load_records(namespace)?
            .into_iter()
            .find(|record| record.key == key))
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool, MemoryError> {
        let lock = self.write_lock(namespace);
        let _guard = lock.lock();
        let mut records = self.load_records(namespace)?;
        let before = records.len();
        records.retain(|record| record.key != key);
        if records.len() == before {
            return Ok(false);
        }
        self.write_records(namespace, &records)?;
        debug!("deleted memory record (namespace={}, key={})", namespace, key);
        Ok(true)
    }

    async fn list(&self, namespace: &Namespace) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.load_records(namespace)
    }
}
