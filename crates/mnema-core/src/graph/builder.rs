//! Builder for the memory agent and its collaborators.

use super::agent::MemoryAgent;
use crate::checkpoint::{CheckpointStore, InMemoryCheckpointStore, JsonCheckpointStore};
use crate::error::AgentError;
use crate::model::ModelClient;
use log::info;
use mnema_config::{MnemaConfig, StoreProvider};
use mnema_memory::{FileMemoryStore, InMemoryStore, MemoryStore};
use mnema_protocol::EventSink;
use mnema_tools::{ToolRegistry, memory_tool_registry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default directory name for file-backed memories.
const DEFAULT_MEMORY_DIR: &str = "memories";
/// Default directory name for file-backed checkpoints.
const DEFAULT_CHECKPOINT_DIR: &str = "checkpoints";

/// Tunables of the orchestration loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    /// Model turns allowed per invocation.
    pub max_iterations: usize,
    /// Budget for a single model call.
    pub model_timeout: Duration,
    /// Budget for a whole invocation, if any.
    pub turn_timeout: Option<Duration>,
    pub search_limit: usize,
    pub query_window: usize,
    pub max_block_chars: usize,
    pub min_score: Option<f32>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&MnemaConfig::default())
    }
}

impl AgentSettings {
    /// Derive loop settings from a loaded config.
    pub fn from_config(config: &MnemaConfig) -> Self {
        Self {
            max_iterations: config.agent.max_iterations,
            model_timeout: Duration::from_secs(config.model.timeout_secs),
            turn_timeout: config.agent.turn_timeout_secs.map(Duration::from_secs),
            search_limit: config.memory.search_limit,
            query_window: config.memory.query_window,
            max_block_chars: config.memory.max_block_chars,
            min_score: config.memory.min_score,
        }
    }
}

/// Assembles a [`MemoryAgent`].
///
/// Only the model client is required; stores default to in-memory
/// implementations and the registry to the memory tools.
pub struct MemoryAgentBuilder {
    model: Arc<dyn ModelClient>,
    memory_store: Option<Arc<dyn MemoryStore>>,
    checkpoint_store: Option<Arc<dyn CheckpointStore>>,
    tools: Option<ToolRegistry>,
    event_sink: Option<Arc<dyn EventSink>>,
    settings: AgentSettings,
}

impl MemoryAgentBuilder {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model,
            memory_store: None,
            checkpoint_store: None,
            tools: None,
            event_sink: None,
            settings: AgentSettings::default(),
        }
    }

    /// Builder with settings and stores taken from config.
    ///
    /// Relative store paths, and the default store directories, resolve
    /// against `data_dir`.
    pub fn from_config(
        model: Arc<dyn ModelClient>,
        config: &MnemaConfig,
        data_dir: impl AsRef<Path>,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        let data_dir = data_dir.as_ref();
        let memory_store: Arc<dyn MemoryStore> = match config.memory.provider {
            StoreProvider::Memory => Arc::new(InMemoryStore::new()),
            StoreProvider::File => {
                let root = resolve_dir(data_dir, config.memory.path.as_deref(), DEFAULT_MEMORY_DIR);
                Arc::new(FileMemoryStore::new(root)?)
            }
        };
        let checkpoint_store: Arc<dyn CheckpointStore> = match config.checkpoints.provider {
            StoreProvider::Memory => Arc::new(InMemoryCheckpointStore::new()),
            StoreProvider::File => {
                let root = resolve_dir(
                    data_dir,
                    config.checkpoints.path.as_deref(),
                    DEFAULT_CHECKPOINT_DIR,
                );
                Arc::new(JsonCheckpointStore::new(root)?)
            }
        };
        info!(
            "agent configured from config (memory={:?}, checkpoints={:?}, max_iterations={})",
            config.memory.provider, config.checkpoints.provider, config.agent.max_iterations
        );
        Ok(Self::new(model)
            .memory_store(memory_store)
            .checkpoint_store(checkpoint_store)
            .settings(AgentSettings::from_config(config)))
    }

    pub fn memory_store(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.memory_store = Some(store);
        self
    }

    pub fn checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoint_store = Some(store);
        self
    }

    /// Replace the tool registry offered to the model.
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Stream turn events to `sink`.
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.settings.max_iterations = max_iterations;
        self
    }

    pub fn model_timeout(mut self, timeout: Duration) -> Self {
        self.settings.model_timeout = timeout;
        self
    }

    pub fn turn_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.settings.turn_timeout = timeout;
        self
    }

    /// Finalize the agent.
    pub fn build(self) -> Result<MemoryAgent, AgentError> {
        if self.settings.max_iterations == 0 {
            return Err(AgentError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.settings.search_limit == 0 {
            return Err(AgentError::Configuration(
                "search_limit must be at least 1".to_string(),
            ));
        }
        Ok(MemoryAgent::new(
            self.model,
            self.memory_store
                .unwrap_or_else(|| Arc::new(InMemoryStore::new())),
            self.checkpoint_store
                .unwrap_or_else(|| Arc::new(InMemoryCheckpointStore::new())),
            self.tools.unwrap_or_else(memory_tool_registry),
            self.event_sink,
            self.settings,
        ))
    }
}

fn resolve_dir(data_dir: &Path, configured: Option<&str>, default: &str) -> PathBuf {
    match configured {
        Some(path) if Path::new(path).is_absolute() => PathBuf::from(path),
        Some(path) => data_dir.join(path),
        None => data_dir.join(default),
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentSettings, resolve_dir};
    use mnema_config::MnemaConfig;
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    #[test]
    fn settings_follow_config_defaults() {
        let settings = AgentSettings::from_config(&MnemaConfig::default());
        assert_eq!(settings.max_iterations, 8);
        assert_eq!(settings.model_timeout, Duration::from_secs(30));
        assert_eq!(settings.turn_timeout, None);
        assert_eq!(settings.search_limit, 10);
        assert_eq!(settings.query_window, 3);
    }

    #[test]
    fn store_dirs_resolve_against_data_dir() {
        let base = Path::new("/data");
        assert_eq!(
            resolve_dir(base, None, "memories"),
            PathBuf::from("/data/memories")
        );
        assert_eq!(
            resolve_dir(base, Some("custom"), "memories"),
            PathBuf::from("/data/custom")
        );
        assert_eq!(
            resolve_dir(base, Some("/abs/dir"), "memories"),
            PathBuf::from("/abs/dir")
        );
    }
}
