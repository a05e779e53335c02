//! Core data types shared across the agent API.

use chrono::Local;
use mnema_config::{AgentConfig, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use mnema_protocol::{Message, Role, ThreadId, ToolCall};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a fresh thread id of the form `session-<YYYYMMDD-HHMMSS>-<6 hex>`.
pub fn generate_thread_id() -> ThreadId {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session-{timestamp}-{}", &suffix[..6])
}

/// Per-conversation invocation context.
///
/// The thread id is fixed at construction; every turn of the same
/// conversation reuses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Owner of the memory namespace.
    pub user_id: String,
    /// Model identifier, optionally `provider/model`.
    pub model: String,
    /// System prompt template with `{user_info}` and `{time}` placeholders.
    pub system_prompt: String,
    /// Conversation thread id.
    pub thread_id: ThreadId,
}

impl Context {
    /// Context for `user_id` with default model, prompt, and a new thread id.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            thread_id: generate_thread_id(),
        }
    }

    /// Context seeded from the agent section of the config.
    pub fn from_config(user_id: impl Into<String>, config: &AgentConfig) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            ..Self::new(user_id)
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Resume an existing thread instead of the generated one.
    pub fn with_thread_id(mut self, thread_id: impl Into<ThreadId>) -> Self {
        self.thread_id = thread_id.into();
        self
    }
}

/// Ordered, append-only message history of one thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub thread_id: ThreadId,
    messages: Vec<Message>,
}

impl ConversationState {
    /// Empty state for a thread with no history.
    pub fn new(thread_id: impl Into<ThreadId>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
        }
    }

    /// State rebuilt from a persisted history.
    pub fn from_messages(thread_id: impl Into<ThreadId>, messages: Vec<Message>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message to the end of the history.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Latest model reply, if any.
    pub fn last_model_reply(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Model)
    }

    /// Tool calls of the last model message that have no tool result yet.
    pub fn unanswered_tool_calls(&self) -> Vec<&ToolCall> {
        let Some(position) = self
            .messages
            .iter()
            .rposition(|message| message.role == Role::Model)
        else {
            return Vec::new();
        };
        let answered = self.messages[position + 1..]
            .iter()
            .filter(|message| message.role == Role::Tool)
            .filter_map(|message| message.tool_call_id.as_deref())
            .collect::<Vec<_>>();
        self.messages[position]
            .tool_calls
            .iter()
            .filter(|call| !answered.contains(&call.id.as_str()))
            .collect()
    }
}

/// Where a turn gets its starting history from.
#[derive(Debug, Clone)]
pub enum TurnInput {
    /// Load the thread's history from the checkpoint store.
    Thread(ThreadId),
    /// Start from a caller-provided history.
    State(ConversationState),
}

impl TurnInput {
    pub fn thread_id(&self) -> &str {
        match self {
            TurnInput::Thread(thread_id) => thread_id,
            TurnInput::State(state) => &state.thread_id,
        }
    }
}

impl From<ConversationState> for TurnInput {
    fn from(state: ConversationState) -> Self {
        TurnInput::State(state)
    }
}

impl From<ThreadId> for TurnInput {
    fn from(thread_id: ThreadId) -> Self {
        TurnInput::Thread(thread_id)
    }
}

impl From<&str> for TurnInput {
    fn from(thread_id: &str) -> Self {
        TurnInput::Thread(thread_id.to_string())
    }
}

impl From<&Context> for TurnInput {
    fn from(ctx: &Context) -> Self {
        TurnInput::Thread(ctx.thread_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{Context, ConversationState, generate_thread_id};
    use mnema_protocol::{Message, ToolCall};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn thread_ids_follow_session_format() {
        let thread_id = generate_thread_id();
        let parts = thread_id.split('-').collect::<Vec<_>>();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "session");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 6);
        assert_eq!(parts[3].len(), 6);
        assert!(parts[3].chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(thread_id, generate_thread_id());
    }

    #[test]
    fn context_defaults() {
        let ctx = Context::new("u1");
        assert_eq!(ctx.model, "gpt-4");
        assert_eq!(
            ctx.system_prompt,
            "You are a helpful assistant. {user_info}\nTime: {time}"
        );
        assert!(ctx.thread_id.starts_with("session-"));
    }

    #[test]
    fn unanswered_tool_calls_tracks_results() {
        let mut state = ConversationState::new("t1");
        state.push(Message::user("hi"));
        state.push(Message::model_with_tool_calls(
            "",
            vec![
                ToolCall::new("a", "upsert_memory", json!({})),
                ToolCall::new("b", "upsert_memory", json!({})),
            ],
        ));
        state.push(Message::tool_result("a", "ok"));
        let pending = state
            .unanswered_tool_calls()
            .into_iter()
            .map(|call| call.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(pending, vec!["b"]);

        state.push(Message::tool_result("b", "ok"));
        assert!(state.unanswered_tool_calls().is_empty());
    }
}
