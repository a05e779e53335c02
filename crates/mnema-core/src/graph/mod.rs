//! Explicit orchestration graph for the memory agent.
//!
//! A turn starts at [`GraphNode::ModelTurn`]. After each model reply,
//! [`route`] picks the next node: replies carrying tool calls go to
//! [`GraphNode::MemoryCommit`], which loops back to `ModelTurn`; anything
//! else ends the turn at [`GraphNode::Done`].

mod agent;
mod builder;
mod commit;

pub use agent::MemoryAgent;
pub use builder::{AgentSettings, MemoryAgentBuilder};

use mnema_protocol::Message;

/// Nodes of the orchestration state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphNode {
    /// Retrieve memories, call the model, append its reply.
    ModelTurn,
    /// Execute the reply's tool calls and append their results.
    MemoryCommit,
    /// Terminal node; the state is checkpointed.
    Done,
}

impl GraphNode {
    /// Node every turn starts from.
    pub const INITIAL: GraphNode = GraphNode::ModelTurn;
}

/// Route on the latest model message.
pub fn route(message: &Message) -> GraphNode {
    if message.has_tool_calls() {
        GraphNode::MemoryCommit
    } else {
        GraphNode::Done
    }
}

#[cfg(test)]
mod tests {
    use super::{GraphNode, route};
    use mnema_protocol::{Message, ToolCall};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn reply_without_tool_calls_is_done() {
        assert_eq!(route(&Message::model("hello")), GraphNode::Done);
    }

    #[test]
    fn reply_with_tool_calls_commits() {
        let message = Message::model_with_tool_calls(
            "",
            vec![ToolCall::new("c1", "upsert_memory", json!({ "content": "x" }))],
        );
        assert_eq!(route(&message), GraphNode::MemoryCommit);
        assert_eq!(GraphNode::INITIAL, GraphNode::ModelTurn);
    }
}
