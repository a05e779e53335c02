//! Core orchestration primitives for Mnema.
//!
//! This crate owns the memory agent state machine, conversation checkpoints,
//! the model client seam, and system prompt assembly.

pub mod checkpoint;
pub mod error;
pub mod graph;
pub mod model;
pub mod prompt;
pub mod types;

/// Checkpoint persistence for conversation threads.
pub use checkpoint::{
    CheckpointError, CheckpointStore, InMemoryCheckpointStore, JsonCheckpointStore, ThreadSummary,
};
/// Agent errors and their coarse classification.
pub use error::{AgentError, ErrorKind};
/// Orchestration graph and the agent that drives it.
pub use graph::{GraphNode, MemoryAgent, MemoryAgentBuilder, route};
/// Event sink for streaming turn events (re-exported from protocol).
pub use mnema_protocol::EventSink;
/// Model client seam and the bundled OpenAI-compatible adapter.
pub use model::{ModelClient, ModelError, ModelRequest, OpenAiChatClient, split_model_and_provider};
/// Conversation context and state.
pub use types::{Context, ConversationState, TurnInput, generate_thread_id};
