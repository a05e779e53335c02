//! Memory agent driving the orchestration graph.

use super::builder::{AgentSettings, MemoryAgentBuilder};
use super::commit::execute_tool_calls;
use super::{GraphNode, route};
use crate::checkpoint::CheckpointStore;
use crate::error::AgentError;
use crate::model::{ModelClient, ModelError, ModelRequest};
use crate::prompt::{build_memory_query, format_memories, render_system_prompt, truncate_chars};
use crate::types::{Context, ConversationState, TurnInput};
use chrono::Utc;
use log::{debug, info, warn};
use mnema_memory::{MemoryStore, Namespace, SearchHit};
use mnema_protocol::{EventMsg, EventPayload, EventSink, Message, Role, ThreadId};
use mnema_tools::{ToolContext, ToolRegistry};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Characters of user text included in turn logs.
const LOG_PREVIEW_CHARS: usize = 60;

/// Memory-augmented conversational agent.
///
/// Cloning is cheap and clones share stores and the in-flight thread set,
/// so at most one turn per thread runs across all clones.
#[derive(Clone)]
pub struct MemoryAgent {
    model: Arc<dyn ModelClient>,
    store: Arc<dyn MemoryStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    tools: ToolRegistry,
    event_sink: Option<Arc<dyn EventSink>>,
    settings: AgentSettings,
    in_flight: Arc<Mutex<HashSet<ThreadId>>>,
}

/// Marks a thread as running until dropped.
struct ThreadGuard {
    in_flight: Arc<Mutex<HashSet<ThreadId>>>,
    thread_id: ThreadId,
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.thread_id);
    }
}

impl MemoryAgent {
    /// Start building an agent around a model client.
    pub fn builder(model: Arc<dyn ModelClient>) -> MemoryAgentBuilder {
        MemoryAgentBuilder::new(model)
    }

    pub(super) fn new(
        model: Arc<dyn ModelClient>,
        store: Arc<dyn MemoryStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        tools: ToolRegistry,
        event_sink: Option<Arc<dyn EventSink>>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            model,
            store,
            checkpoints,
            tools,
            event_sink,
            settings,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn memory_store(&self) -> Arc<dyn MemoryStore> {
        self.store.clone()
    }

    pub fn checkpoint_store(&self) -> Arc<dyn CheckpointStore> {
        self.checkpoints.clone()
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Run one turn on the context's own thread.
    pub async fn chat(
        &self,
        user_text: &str,
        ctx: &Context,
    ) -> Result<ConversationState, AgentError> {
        self.run_turn(ctx, user_text, ctx).await
    }

    /// Append `user_text` to a thread and drive the graph until `Done`.
    ///
    /// The thread history comes from the checkpoint store or from the
    /// provided state. The checkpoint is written only when the turn reaches
    /// `Done`; any failure leaves it untouched.
    pub async fn run_turn(
        &self,
        input: impl Into<TurnInput>,
        user_text: &str,
        ctx: &Context,
    ) -> Result<ConversationState, AgentError> {
        let input = input.into();
        let thread_id = input.thread_id().to_string();
        let _guard = self.acquire_thread(&thread_id)?;
        info!(
            "starting turn (thread_id={}, user_id={}, text={:?})",
            thread_id,
            ctx.user_id,
            truncate_chars(user_text, LOG_PREVIEW_CHARS)
        );

        let result = match self.settings.turn_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.execute(input, user_text, ctx)).await {
                    Ok(result) => result,
                    Err(_) => Err(AgentError::Cancelled(format!(
                        "turn exceeded {}s",
                        limit.as_secs_f64()
                    ))),
                }
            }
            None => self.execute(input, user_text, ctx).await,
        };

        match &result {
            Ok(state) => info!(
                "completed turn (thread_id={}, messages={})",
                thread_id,
                state.len()
            ),
            Err(err) => {
                warn!(
                    "turn failed (thread_id={}, kind={}, err={})",
                    thread_id,
                    err.kind().as_str(),
                    err
                );
                self.emit(
                    &thread_id,
                    EventPayload::TurnFailed {
                        kind: err.kind().as_str().to_string(),
                        message: err.to_string(),
                    },
                );
            }
        }
        result
    }

    fn acquire_thread(&self, thread_id: &str) -> Result<ThreadGuard, AgentError> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(thread_id.to_string()) {
            return Err(AgentError::ThreadBusy(thread_id.to_string()));
        }
        Ok(ThreadGuard {
            in_flight: self.in_flight.clone(),
            thread_id: thread_id.to_string(),
        })
    }

    async fn execute(
        &self,
        input: TurnInput,
        user_text: &str,
        ctx: &Context,
    ) -> Result<ConversationState, AgentError> {
        let mut state = match input {
            TurnInput::Thread(thread_id) => self.checkpoints.load(&thread_id)?,
            TurnInput::State(state) => state,
        };
        let pending = state.unanswered_tool_calls();
        if !pending.is_empty() {
            let ids = pending
                .iter()
                .map(|call| call.id.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AgentError::Configuration(format!(
                "thread {} has unanswered tool calls: {ids}",
                state.thread_id
            )));
        }

        let tool_ctx = ToolContext::new(
            ctx.user_id.clone(),
            state.thread_id.clone(),
            self.store.clone(),
        );
        self.emit(
            &state.thread_id,
            EventPayload::TurnStarted {
                user_id: ctx.user_id.clone(),
            },
        );
        self.append(&mut state, Message::user(user_text));

        let mut node = GraphNode::INITIAL;
        let mut model_turns = 0usize;
        loop {
            node = match node {
                GraphNode::ModelTurn => {
                    if model_turns >= self.settings.max_iterations {
                        warn!(
                            "loop limit reached (thread_id={}, limit={})",
                            state.thread_id, self.settings.max_iterations
                        );
                        return Err(AgentError::LoopLimitExceeded {
                            limit: self.settings.max_iterations,
                            state: Box::new(state),
                        });
                    }
                    model_turns += 1;
                    let reply = self.model_turn(&state, ctx).await?;
                    let next = route(&reply);
                    debug!(
                        "model turn finished (thread_id={}, iteration={}, tool_calls={}, next={:?})",
                        state.thread_id,
                        model_turns,
                        reply.tool_calls.len(),
                        next
                    );
                    self.append(&mut state, reply);
                    next
                }
                GraphNode::MemoryCommit => {
                    let calls = state
                        .last_message()
                        .map(|message| message.tool_calls.clone())
                        .unwrap_or_default();
                    let results = execute_tool_calls(&self.tools, &tool_ctx, &calls).await;
                    for result in results {
                        self.append(&mut state, result);
                    }
                    GraphNode::ModelTurn
                }
                GraphNode::Done => break,
            };
        }

        self.checkpoints.save(&state)?;
        self.emit(
            &state.thread_id,
            EventPayload::TurnCompleted {
                message_count: state.len(),
            },
        );
        Ok(state)
    }

    /// Retrieve memories, render the prompt, and call the model once.
    async fn model_turn(
        &self,
        state: &ConversationState,
        ctx: &Context,
    ) -> Result<Message, AgentError> {
        let namespace = Namespace::memories(ctx.user_id.clone());
        let query = build_memory_query(state.messages(), self.settings.query_window);
        let hits = self.retrieve(&namespace, &query, &state.thread_id).await;
        let memories = format_memories(&hits, self.settings.max_block_chars);
        let system_prompt = render_system_prompt(&ctx.system_prompt, &memories, Utc::now());

        let request = ModelRequest {
            model: ctx.model.clone(),
            system_prompt,
            messages: state.messages().to_vec(),
            tools: self.tools.specs(),
        };
        let timeout = self.settings.model_timeout;
        let reply = match tokio::time::timeout(timeout, self.model.invoke(request)).await {
            Ok(reply) => reply?,
            Err(_) => return Err(ModelError::Timeout(timeout).into()),
        };
        validate_reply(&reply)?;
        Ok(reply)
    }

    /// Best-effort memory search; failures degrade to no memories.
    async fn retrieve(&self, namespace: &Namespace, query: &str, thread_id: &str) -> Vec<SearchHit> {
        match self
            .store
            .search(namespace, query, self.settings.search_limit)
            .await
        {
            Ok(hits) => match self.settings.min_score {
                Some(min_score) => hits.into_iter().filter(|hit| hit.score >= min_score).collect(),
                None => hits,
            },
            Err(err) => {
                warn!(
                    "memory search failed, continuing without memories (thread_id={}, namespace={}, err={})",
                    thread_id, namespace, err
                );
                Vec::new()
            }
        }
    }

    fn append(&self, state: &mut ConversationState, message: Message) {
        if self.event_sink.is_some() {
            self.emit(
                &state.thread_id,
                EventPayload::MessageAppended {
                    message: message.clone(),
                },
            );
        }
        state.push(message);
    }

    fn emit(&self, thread_id: &str, payload: EventPayload) {
        if let Some(sink) = &self.event_sink {
            sink.emit(EventMsg::new(thread_id, payload));
        }
    }
}

/// Reject replies that would break tool-result bookkeeping.
fn validate_reply(reply: &Message) -> Result<(), ModelError> {
    if reply.role != Role::Model {
        return Err(ModelError::InvalidResponse(format!(
            "expected a model message, got role {}",
            reply.role.as_str()
        )));
    }
    let mut seen = HashSet::new();
    for call in &reply.tool_calls {
        if call.id.is_empty() || !seen.insert(call.id.as_str()) {
            return Err(ModelError::InvalidResponse(format!(
                "tool call ids must be unique and non-empty (id={:?})",
                call.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_reply;
    use mnema_protocol::{Message, ToolCall};
    use serde_json::json;

    #[test]
    fn replies_need_unique_call_ids() {
        let ok = Message::model_with_tool_calls(
            "",
            vec![
                ToolCall::new("a", "upsert_memory", json!({})),
                ToolCall::new("b", "upsert_memory", json!({})),
            ],
        );
        assert!(validate_reply(&ok).is_ok());

        let duplicate = Message::model_with_tool_calls(
            "",
            vec![
                ToolCall::new("a", "upsert_memory", json!({})),
                ToolCall::new("a", "upsert_memory", json!({})),
            ],
        );
        assert!(validate_reply(&duplicate).is_err());
        assert!(validate_reply(&Message::user("hi")).is_err());
    }
}
