//! Wire protocol types for Mnema conversations, tool calls, and events.

mod tool;

pub use tool::ToolError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identifier of a conversation thread.
pub type ThreadId = String;

/// Speaker role for a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User-authored message.
    User,
    /// Model-authored message, optionally carrying tool calls.
    Model,
    /// Result of a host-executed tool call.
    Tool,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
            Role::Tool => "tool",
        }
    }
}

/// Structured request from the model to execute a named tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Call identifier, unique within the originating message.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Tool arguments as a JSON object.
    #[serde(default = "empty_json_object")]
    pub args: Value,
}

impl ToolCall {
    /// Build a tool call from its parts.
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// Message stored in a conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role that produced the message.
    pub role: Role,
    /// Textual content.
    #[serde(default)]
    pub content: String,
    /// Tool calls requested by a model message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Correlates a tool message with the call it answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Timestamp for the message.
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            created_at: Utc::now(),
        }
    }

    /// User message with text content.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Plain model reply without tool calls.
    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }

    /// Model message requesting tool calls.
    pub fn model_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Model, content)
        }
    }

    /// Tool result answering the call `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Whether this message requests at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Wrapper for events emitted while a turn runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMsg {
    /// Unique id for the event.
    pub id: Uuid,
    /// Thread the event belongs to.
    pub thread_id: ThreadId,
    /// Timestamp when the event was created.
    pub created_at: DateTime<Utc>,
    /// Event payload content.
    pub payload: EventPayload,
}

impl EventMsg {
    /// Build an event stamped with a fresh id and the current time.
    pub fn new(thread_id: impl Into<ThreadId>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_id: thread_id.into(),
            created_at: Utc::now(),
            payload,
        }
    }
}

/// Events emitted during orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum EventPayload {
    /// Turn started with the user message already appended.
    TurnStarted { user_id: String },
    /// A message was appended to the working history.
    MessageAppended { message: Message },
    /// Turn reached the terminal node.
    TurnCompleted { message_count: usize },
    /// Turn aborted with a structured error.
    TurnFailed { kind: String, message: String },
}

/// Sink interface for turn events.
pub trait EventSink: Send + Sync {
    /// Emit an event to downstream listeners.
    fn emit(&self, event: EventMsg);
}

/// Default value for tool call arguments.
fn empty_json_object() -> Value {
    Value::Object(serde_json::Map::new())
}
