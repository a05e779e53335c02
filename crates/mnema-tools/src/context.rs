//! Tool execution context.

use mnema_memory::{MemoryStore, Namespace};
use std::fmt;
use std::sync::Arc;

/// Shared context passed to tools during execution.
///
/// Cloned once per tool call; the store is shared behind an `Arc`.
#[derive(Clone)]
pub struct ToolContext {
    /// User whose memory namespace the tools write to.
    pub user_id: String,
    /// Conversation thread that issued the call.
    pub thread_id: String,
    /// Id of the tool call being executed, if any.
    pub tool_call_id: Option<String>,
    /// Memory store backing persistence tools.
    pub store: Arc<dyn MemoryStore>,
}

impl ToolContext {
    /// Create a context for a user and thread.
    pub fn new(
        user_id: impl Into<String>,
        thread_id: impl Into<String>,
        store: Arc<dyn MemoryStore>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            thread_id: thread_id.into(),
            tool_call_id: None,
            store,
        }
    }

    /// Return a copy scoped to a single tool call.
    pub fn with_tool_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.tool_call_id = Some(call_id.into());
        self
    }

    /// Memory namespace of the context's user.
    pub fn namespace(&self) -> Namespace {
        Namespace::memories(self.user_id.clone())
    }
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("user_id", &self.user_id)
            .field("thread_id", &self.thread_id)
            .field("tool_call_id", &self.tool_call_id)
            .finish_non_exhaustive()
    }
}
