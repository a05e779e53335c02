use async_trait::async_trait;
use mnema_core::{ModelClient, ModelError, ModelRequest};
use mnema_protocol::{Message, Role, ToolCall};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// `upsert_memory` call with the given id and content.
pub fn upsert_call(id: &str, content: &str) -> ToolCall {
    ToolCall::new(id, "upsert_memory", json!({ "content": content }))
}

/// Model that replays a fixed script and records every request.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    script: Arc<Mutex<VecDeque<Result<Message, ModelError>>>>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = Message>) -> Self {
        Self {
            script: Arc::new(Mutex::new(replies.into_iter().map(Ok).collect())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue another reply or failure.
    pub fn push(&self, reply: Result<Message, ModelError>) {
        self.script.lock().push_back(reply);
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn invoke(&self, request: ModelRequest) -> Result<Message, ModelError> {
        self.requests.lock().push(request);
        self.script.lock().pop_front().unwrap_or_else(|| {
            Err(ModelError::InvalidResponse(
                "scripted model exhausted".to_string(),
            ))
        })
    }
}

/// Model that always fails with a transport error.
#[derive(Clone, Default)]
pub struct FailingModel {
    calls: Arc<AtomicUsize>,
}

impl FailingModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for FailingModel {
    async fn invoke(&self, _request: ModelRequest) -> Result<Message, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ModelError::Transport("connection refused".to_string()))
    }
}

/// Model that requests a new memory write on every call.
#[derive(Clone, Default)]
pub struct AlwaysToolCallModel {
    calls: Arc<AtomicUsize>,
}

impl AlwaysToolCallModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for AlwaysToolCallModel {
    async fn invoke(&self, _request: ModelRequest) -> Result<Message, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Message::model_with_tool_calls(
            "",
            vec![upsert_call(&format!("call_{call}"), &format!("fact number {call}"))],
        ))
    }
}

/// Model that waits before answering with a fixed reply.
#[derive(Clone)]
pub struct SlowModel {
    delay: Duration,
    reply: Message,
}

impl SlowModel {
    pub fn new(delay: Duration, reply: Message) -> Self {
        Self { delay, reply }
    }
}

#[async_trait]
impl ModelClient for SlowModel {
    async fn invoke(&self, _request: ModelRequest) -> Result<Message, ModelError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }
}

/// Rule-based model for end-to-end scenarios.
///
/// - A user message starting with `remember ` becomes an `upsert_memory`
///   call with the remaining text.
/// - A trailing tool result is acknowledged with `Noted.`.
/// - Anything else is answered with the rendered system prompt, so tests can
///   see which memories were injected.
#[derive(Clone, Default)]
pub struct MemoryEchoModel {
    calls: Arc<AtomicUsize>,
}

impl MemoryEchoModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for MemoryEchoModel {
    async fn invoke(&self, request: ModelRequest) -> Result<Message, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(last) = request.messages.last() else {
            return Err(ModelError::InvalidResponse("empty history".to_string()));
        };
        match last.role {
            Role::Tool => Ok(Message::model("Noted.")),
            Role::User => match last.content.strip_prefix("remember ") {
                Some(fact) => Ok(Message::model_with_tool_calls(
                    "",
                    vec![upsert_call(&format!("call_{call}"), fact)],
                )),
                None => Ok(Message::model(request.system_prompt)),
            },
            Role::Model => Ok(Message::model(request.system_prompt)),
        }
    }
}
