//! Conversation checkpoints keyed by thread id.

use crate::types::ConversationState;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use mnema_protocol::{Message, ThreadId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Checkpoint document version written by this crate.
const SCHEMA_VERSION: u32 = 1;

/// Summary record used for listing threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: ThreadId,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Persistent store for conversation histories.
///
/// A save fully replaces the thread's previous checkpoint.
pub trait CheckpointStore: Send + Sync {
    /// Load a thread, returning an empty state when nothing was saved yet.
    fn load(&self, thread_id: &str) -> Result<ConversationState, CheckpointError>;
    /// Overwrite the checkpoint of `state.thread_id`.
    fn save(&self, state: &ConversationState) -> Result<(), CheckpointError>;
    /// List saved threads, most recently updated first.
    fn list_threads(&self) -> Result<Vec<ThreadSummary>, CheckpointError>;
    /// Delete a thread's checkpoint.
    fn delete(&self, thread_id: &str) -> Result<bool, CheckpointError>;
}

/// Errors returned by checkpoint stores.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported schema version: {0}")]
    UnsupportedSchema(u32),
    #[error("invalid thread id: {0:?}")]
    InvalidThreadId(String),
}

/// Process-local checkpoint store.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    threads: RwLock<HashMap<ThreadId, (DateTime<Utc>, Vec<Message>)>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self, thread_id: &str) -> Result<ConversationState, CheckpointError> {
        let messages = self
            .threads
            .read()
            .get(thread_id)
            .map(|(_, messages)| messages.clone())
            .unwrap_or_default();
        Ok(ConversationState::from_messages(thread_id, messages))
    }

    fn save(&self, state: &ConversationState) -> Result<(), CheckpointError> {
        self.threads.write().insert(
            state.thread_id.clone(),
            (Utc::now(), state.messages().to_vec()),
        );
        debug!(
            "saved checkpoint (thread_id={}, messages={})",
            state.thread_id,
            state.len()
        );
        Ok(())
    }

    fn list_threads(&self) -> Result<Vec<ThreadSummary>, CheckpointError> {
        let mut summaries = self
            .threads
            .read()
            .iter()
            .map(|(thread_id, (updated_at, messages))| ThreadSummary {
                thread_id: thread_id.clone(),
                message_count: messages.len(),
                updated_at: *updated_at,
            })
            .collect::<Vec<_>>();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    fn delete(&self, thread_id: &str) -> Result<bool, CheckpointError> {
        Ok(self.threads.write().remove(thread_id).is_some())
    }
}

/// On-disk checkpoint document.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointDocument {
    schema_version: u32,
    thread_id: ThreadId,
    updated_at: DateTime<Utc>,
    messages: Vec<Message>,
}

/// JSON-file checkpoint store writing one document per thread.
pub struct JsonCheckpointStore {
    /// Root directory for checkpoint documents.
    root: PathBuf,
}

impl JsonCheckpointStore {
    /// Create a new store under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("initialized JSON checkpoint store (root={})", root.display());
        Ok(Self { root })
    }

    fn checkpoint_path(&self, thread_id: &str) -> Result<PathBuf, CheckpointError> {
        validate_thread_id(thread_id)?;
        Ok(self.root.join(format!("{thread_id}.json")))
    }

    fn read_document(&self, path: &Path) -> Result<CheckpointDocument, CheckpointError> {
        let contents = fs::read_to_string(path)?;
        let document: CheckpointDocument = serde_json::from_str(&contents)?;
        if document.schema_version != SCHEMA_VERSION {
            return Err(CheckpointError::UnsupportedSchema(document.schema_version));
        }
        Ok(document)
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self, thread_id: &str) -> Result<ConversationState, CheckpointError> {
        let path = self.checkpoint_path(thread_id)?;
        if !path.exists() {
            debug!("no checkpoint yet (thread_id={})", thread_id);
            return Ok(ConversationState::new(thread_id));
        }
        let document = self.read_document(&path)?;
        debug!(
            "loaded checkpoint (thread_id={}, messages={})",
            thread_id,
            document.messages.len()
        );
        Ok(ConversationState::from_messages(
            document.thread_id,
            document.messages,
        ))
    }

    fn save(&self, state: &ConversationState) -> Result<(), CheckpointError> {
        let path = self.checkpoint_path(&state.thread_id)?;
        let document = CheckpointDocument {
            schema_version: SCHEMA_VERSION,
            thread_id: state.thread_id.clone(),
            updated_at: Utc::now(),
            messages: state.messages().to_vec(),
        };
        // Temp names are unique per save, even across stores sharing a root.
        let mut file = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut file, &document)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(std::io::Error::from)?;
        debug!(
            "saved checkpoint (thread_id={}, messages={})",
            state.thread_id,
            state.len()
        );
        Ok(())
    }

    fn list_threads(&self) -> Result<Vec<ThreadSummary>, CheckpointError> {
        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let document = match self.read_document(&path) {
                Ok(document) => document,
                Err(err) => {
                    warn!(
                        "skipping unreadable checkpoint (path={}, err={})",
                        path.display(),
                        err
                    );
                    continue;
                }
            };
            summaries.push(ThreadSummary {
                thread_id: document.thread_id,
                message_count: document.messages.len(),
                updated_at: document.updated_at,
            });
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    fn delete(&self, thread_id: &str) -> Result<bool, CheckpointError> {
        let path = self.checkpoint_path(thread_id)?;
        if path.exists() {
            info!("deleting checkpoint (thread_id={})", thread_id);
            fs::remove_file(path)?;
            Ok(true)
        } else {
            warn!("checkpoint not found (thread_id={})", thread_id);
            Ok(false)
        }
    }
}

/// Reject ids that would escape the checkpoint directory.
fn validate_thread_id(thread_id: &str) -> Result<(), CheckpointError> {
    let trimmed = thread_id.trim();
    if trimmed.is_empty()
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains("..")
    {
        return Err(CheckpointError::InvalidThreadId(thread_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CheckpointError, CheckpointStore, InMemoryCheckpointStore, JsonCheckpointStore};
    use crate::types::ConversationState;
    use mnema_protocol::{Message, ToolCall};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_state(thread_id: &str) -> ConversationState {
        let mut state = ConversationState::new(thread_id);
        state.push(Message::user("my favorite color is blue"));
        state.push(Message::model_with_tool_calls(
            "",
            vec![ToolCall::new(
                "call_1",
                "upsert_memory",
                json!({ "content": "favorite color is blue" }),
            )],
        ));
        state.push(Message::tool_result("call_1", "Stored memory abc"));
        state.push(Message::model("Noted!"));
        state
    }

    #[test]
    fn json_store_round_trip() {
        let temp = tempdir().expect("tempdir");
        let store = JsonCheckpointStore::new(temp.path()).expect("store");
        let state = sample_state("session-1");
        store.save(&state).expect("save");

        let loaded = store.load("session-1").expect("load");
        assert_eq!(loaded, state);

        let summaries = store.list_threads().expect("list");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].thread_id, "session-1");
        assert_eq!(summaries[0].message_count, 4);

        assert_eq!(store.delete("session-1").expect("delete"), true);
        assert!(store.load("session-1").expect("load").is_empty());
    }

    #[test]
    fn json_store_survives_reopen_and_overwrites() {
        let temp = tempdir().expect("tempdir");
        {
            let store = JsonCheckpointStore::new(temp.path()).expect("store");
            store.save(&sample_state("t")).expect("save");
            let mut shorter = ConversationState::new("t");
            shorter.push(Message::user("only"));
            store.save(&shorter).expect("save");
        }
        let store = JsonCheckpointStore::new(temp.path()).expect("store");
        let loaded = store.load("t").expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.messages()[0].content, "only");
    }

    #[test]
    fn json_stores_sharing_root_save_concurrently() {
        let temp = tempdir().expect("tempdir");
        let first = JsonCheckpointStore::new(temp.path()).expect("store");
        let second = JsonCheckpointStore::new(temp.path()).expect("store");

        std::thread::scope(|scope| {
            for (index, store) in [&first, &second].into_iter().enumerate() {
                scope.spawn(move || {
                    for round in 0..20 {
                        store
                            .save(&sample_state("shared"))
                            .expect("save shared");
                        store
                            .save(&sample_state(&format!("own-{index}-{round}")))
                            .expect("save own");
                    }
                });
            }
        });

        let shared = first.load("shared").expect("load");
        assert_eq!(shared.thread_id, "shared");
        assert_eq!(shared.len(), 4);
        assert_eq!(second.list_threads().expect("list").len(), 41);
        let leftovers = std::fs::read_dir(temp.path())
            .expect("dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) != Some("json"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn json_store_rejects_unknown_schema() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(
            temp.path().join("t.json"),
            r#"{"schema_version":9,"thread_id":"t","updated_at":"2024-01-01T00:00:00Z","messages":[]}"#,
        )
        .expect("write");
        let store = JsonCheckpointStore::new(temp.path()).expect("store");
        let err = store.load("t").unwrap_err();
        assert!(matches!(err, CheckpointError::UnsupportedSchema(9)));
    }

    #[test]
    fn json_store_rejects_path_like_thread_ids() {
        let temp = tempdir().expect("tempdir");
        let store = JsonCheckpointStore::new(temp.path()).expect("store");
        for thread_id in ["../escape", "a/b", "a\\b", ""] {
            let err = store.load(thread_id).unwrap_err();
            assert!(matches!(err, CheckpointError::InvalidThreadId(_)));
        }
    }

    #[test]
    fn in_memory_store_starts_empty_per_thread() {
        let store = InMemoryCheckpointStore::new();
        store.save(&sample_state("a")).expect("save");
        assert_eq!(store.load("a").expect("load").len(), 4);
        assert!(store.load("b").expect("load").is_empty());
        assert_eq!(store.list_threads().expect("list").len(), 1);
        assert!(store.delete("a").expect("delete"));
        assert!(!store.delete("a").expect("delete"));
    }
}
