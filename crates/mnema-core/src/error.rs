//! Error types for the core orchestrator crate.

use crate::checkpoint::CheckpointError;
use crate::model::ModelError;
use crate::types::ConversationState;
use mnema_config::ConfigError;
use mnema_memory::MemoryError;
use mnema_protocol::ThreadId;
use thiserror::Error;

/// Coarse classification of agent failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    MemoryStoreUnavailable,
    ModelCallFailure,
    LoopLimitExceeded,
    Cancelled,
    Checkpoint,
    ThreadBusy,
}

impl ErrorKind {
    /// Stable snake_case label used in events and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::MemoryStoreUnavailable => "memory_store_unavailable",
            ErrorKind::ModelCallFailure => "model_call_failure",
            ErrorKind::LoopLimitExceeded => "loop_limit_exceeded",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Checkpoint => "checkpoint",
            ErrorKind::ThreadBusy => "thread_busy",
        }
    }
}

/// Errors returned by agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Invalid or missing configuration, raised before any turn runs.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Memory backend could not be opened.
    #[error("memory store unavailable: {0}")]
    MemoryStoreUnavailable(#[from] MemoryError),
    /// Model invocation failed; nothing from the turn was persisted.
    #[error("model call failed: {0}")]
    ModelCall(#[from] ModelError),
    /// The model kept requesting tool calls past the loop limit.
    #[error("loop limit exceeded after {limit} model turns")]
    LoopLimitExceeded {
        limit: usize,
        /// State after the last completed memory commit.
        state: Box<ConversationState>,
    },
    /// Turn was cancelled before reaching the terminal node.
    #[error("turn cancelled: {0}")]
    Cancelled(String),
    /// Loading or saving a checkpoint failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
    /// Another turn is already running on this thread.
    #[error("thread busy: {0}")]
    ThreadBusy(ThreadId),
}

impl AgentError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::Configuration(_) => ErrorKind::Configuration,
            AgentError::MemoryStoreUnavailable(_) => ErrorKind::MemoryStoreUnavailable,
            AgentError::ModelCall(_) => ErrorKind::ModelCallFailure,
            AgentError::LoopLimitExceeded { .. } => ErrorKind::LoopLimitExceeded,
            AgentError::Cancelled(_) => ErrorKind::Cancelled,
            AgentError::Checkpoint(_) => ErrorKind::Checkpoint,
            AgentError::ThreadBusy(_) => ErrorKind::ThreadBusy,
        }
    }

    /// Latest consistent state carried by the error, if any.
    pub fn partial_state(&self) -> Option<&ConversationState> {
        match self {
            AgentError::LoopLimitExceeded { state, .. } => Some(state),
            _ => None,
        }
    }
}

impl From<ConfigError> for AgentError {
    fn from(err: ConfigError) -> Self {
        AgentError::Configuration(err.to_string())
    }
}
