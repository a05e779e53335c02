//! Configuration schema for Mnema.

use serde::{Deserialize, Serialize};

/// Default system prompt template; see `AgentConfig::system_prompt`.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. {user_info}\nTime: {time}";

/// Default model identifier used when a conversation does not pick one.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Root config for the Mnema agent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MnemaConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub checkpoints: CheckpointConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

impl MnemaConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> MnemaConfigBuilder {
        MnemaConfigBuilder::new()
    }
}

/// Builder for assembling a `MnemaConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct MnemaConfigBuilder {
    config: MnemaConfig,
}

impl MnemaConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: MnemaConfig::default(),
        }
    }

    /// Replace the agent loop configuration.
    pub fn agent(mut self, agent: AgentConfig) -> Self {
        self.config.agent = agent;
        self
    }

    /// Replace the memory store configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the checkpoint store configuration.
    pub fn checkpoints(mut self, checkpoints: CheckpointConfig) -> Self {
        self.config.checkpoints = checkpoints;
        self
    }

    /// Replace the model client configuration.
    pub fn model(mut self, model: ModelConfig) -> Self {
        self.config.model = model;
        self
    }

    /// Finalize and return the built `MnemaConfig`.
    pub fn build(self) -> MnemaConfig {
        self.config
    }
}

/// Orchestration loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Default model identifier, optionally `provider/model`.
    #[serde(default = "default_model")]
    pub model: String,
    /// System prompt template with `{user_info}` and `{time}` placeholders.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Maximum model turns per invocation.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Optional wall-clock budget for a whole invocation.
    #[serde(default)]
    pub turn_timeout_secs: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            system_prompt: default_system_prompt(),
            max_iterations: default_max_iterations(),
            turn_timeout_secs: None,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_max_iterations() -> usize {
    8
}

/// Storage backend selection shared by memory and checkpoint stores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    /// Process-local storage, lost on exit.
    Memory,
    /// File-backed storage under `path`.
    #[default]
    File,
}

/// Memory store and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub provider: StoreProvider,
    #[serde(default)]
    pub path: Option<String>,
    /// Maximum records retrieved per model turn.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Number of trailing messages used to build the retrieval query.
    #[serde(default = "default_query_window")]
    pub query_window: usize,
    /// Upper bound for the formatted memory block in the system prompt.
    #[serde(default = "default_max_block_chars")]
    pub max_block_chars: usize,
    /// Drop hits scoring below this value.
    #[serde(default)]
    pub min_score: Option<f32>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            provider: StoreProvider::default(),
            path: None,
            search_limit: default_search_limit(),
            query_window: default_query_window(),
            max_block_chars: default_max_block_chars(),
            min_score: None,
        }
    }
}

fn default_search_limit() -> usize {
    10
}

fn default_query_window() -> usize {
    3
}

fn default_max_block_chars() -> usize {
    4000
}

/// Conversation checkpoint persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub provider: StoreProvider,
    #[serde(default)]
    pub path: Option<String>,
}

/// Remote model client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
