//! Model client seam used by the orchestration graph.

mod openai;

pub use openai::OpenAiChatClient;

use async_trait::async_trait;
use mnema_protocol::Message;
use mnema_tools::ToolSpec;
use std::time::Duration;
use thiserror::Error;

/// Everything the model sees for one invocation.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Model identifier, optionally `provider/model`.
    pub model: String,
    /// Rendered system prompt.
    pub system_prompt: String,
    /// Full conversation history.
    pub messages: Vec<Message>,
    /// Tools the model may call.
    pub tools: Vec<ToolSpec>,
}

/// Errors returned by model clients.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("model returned status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

/// Chat model that returns one model message per invocation.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run the model on a request. The returned message must have the model role.
    async fn invoke(&self, request: ModelRequest) -> Result<Message, ModelError>;
}

/// Split `provider/model` into its parts.
///
/// Identifiers without a slash have no provider.
pub fn split_model_and_provider(fully_specified: &str) -> (Option<&str>, &str) {
    match fully_specified.split_once('/') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
            (Some(provider), model)
        }
        _ => (None, fully_specified),
    }
}

#[cfg(test)]
mod tests {
    use super::split_model_and_provider;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_provider_prefix() {
        assert_eq!(
            split_model_and_provider("openai/gpt-4o"),
            (Some("openai"), "gpt-4o")
        );
        assert_eq!(split_model_and_provider("gpt-4"), (None, "gpt-4"));
        assert_eq!(split_model_and_provider("/gpt-4"), (None, "/gpt-4"));
    }
}
