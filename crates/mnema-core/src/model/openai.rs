//! OpenAI-compatible chat completions adapter.

use super::{ModelClient, ModelError, ModelRequest, split_model_and_provider};
use crate::error::AgentError;
use async_trait::async_trait;
use log::{debug, info};
use mnema_config::ModelConfig;
use mnema_protocol::{Message, Role, ToolCall};
use mnema_tools::ToolSpec;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Model client speaking the `/chat/completions` protocol.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiChatClient {
    /// Create a client for `base_url` authenticated with `api_key`.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AgentError::Configuration(format!("http client: {err}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &ModelConfig) -> Result<Self, AgentError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            AgentError::Configuration(format!(
                "missing API key: environment variable {} is not set",
                config.api_key_env
            ))
        })?;
        info!(
            "configured chat completions client (base_url={}, timeout_secs={})",
            config.base_url, config.timeout_secs
        );
        Self::new(
            api_key,
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatMessageToolCall>>,
}

#[derive(Serialize)]
struct ChatMessageToolCall {
    id: String,
    r#type: &'static str,
    function: ChatFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct ChatTool {
    r#type: &'static str,
    function: ChatFunction,
}

#[derive(Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatResponseToolCall>>,
}

#[derive(Deserialize)]
struct ChatResponseToolCall {
    id: String,
    function: ChatFunctionCall,
}

fn to_chat_message(message: &Message) -> ChatMessage {
    match message.role {
        Role::User => ChatMessage {
            role: "user",
            content: Some(message.content.clone()),
            tool_call_id: None,
            tool_calls: None,
        },
        Role::Model => {
            let tool_calls = message.has_tool_calls().then(|| {
                message
                    .tool_calls
                    .iter()
                    .map(|call| ChatMessageToolCall {
                        id: call.id.clone(),
                        r#type: "function",
                        function: ChatFunctionCall {
                            name: call.name.clone(),
                            arguments: call.args.to_string(),
                        },
                    })
                    .collect()
            });
            let content = if message.content.is_empty() && tool_calls.is_some() {
                None
            } else {
                Some(message.content.clone())
            };
            ChatMessage {
                role: "assistant",
                content,
                tool_call_id: None,
                tool_calls,
            }
        }
        Role::Tool => ChatMessage {
            role: "tool",
            content: Some(message.content.clone()),
            tool_call_id: message.tool_call_id.clone(),
            tool_calls: None,
        },
    }
}

fn to_chat_tool(spec: &ToolSpec) -> ChatTool {
    ChatTool {
        r#type: "function",
        function: ChatFunction {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: spec.args_schema.clone(),
        },
    }
}

fn parse_arguments(raw: &str) -> Result<Value, ModelError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| ModelError::InvalidResponse(format!("tool arguments: {err}")))?;
    if !value.is_object() {
        return Err(ModelError::InvalidResponse(
            "tool arguments must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

fn build_request(request: &ModelRequest) -> ChatRequest {
    let (_, model) = split_model_and_provider(&request.model);
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(ChatMessage {
        role: "system",
        content: Some(request.system_prompt.clone()),
        tool_call_id: None,
        tool_calls: None,
    });
    messages.extend(request.messages.iter().map(to_chat_message));
    let tools =
        (!request.tools.is_empty()).then(|| request.tools.iter().map(to_chat_tool).collect());
    ChatRequest {
        model: model.to_string(),
        messages,
        tools,
    }
}

#[async_trait]
impl ModelClient for OpenAiChatClient {
    async fn invoke(&self, request: ModelRequest) -> Result<Message, ModelError> {
        let body = build_request(&request);
        debug!(
            "sending chat completion (model={}, messages={}, tools={})",
            body.model,
            body.messages.len(),
            request.tools.len()
        );
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ModelError::Timeout(self.timeout)
                } else {
                    ModelError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| ModelError::InvalidResponse(err.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("no choices returned".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                Ok(ToolCall::new(
                    call.id,
                    call.function.name,
                    parse_arguments(&call.function.arguments)?,
                ))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;
        let content = choice.message.content.unwrap_or_default();
        debug!(
            "chat completion received (content_len={}, tool_calls={})",
            content.len(),
            tool_calls.len()
        );
        Ok(Message::model_with_tool_calls(content, tool_calls))
    }
}

#[cfg(test)]
mod tests {
    use super::{build_request, parse_arguments};
    use crate::model::ModelRequest;
    use mnema_protocol::{Message, ToolCall};
    use mnema_tools::ToolSpec;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_maps_roles_and_tool_calls() {
        let request = ModelRequest {
            model: "openai/gpt-4o".to_string(),
            system_prompt: "sys".to_string(),
            messages: vec![
                Message::user("hi"),
                Message::model_with_tool_calls(
                    "",
                    vec![ToolCall::new("c1", "upsert_memory", json!({ "content": "x" }))],
                ),
                Message::tool_result("c1", "Stored memory k"),
            ],
            tools: vec![ToolSpec {
                name: "upsert_memory".to_string(),
                description: "store".to_string(),
                args_schema: json!({ "type": "object" }),
            }],
        };
        let body = serde_json::to_value(build_request(&request)).expect("serialize");
        assert_eq!(body["model"], json!("gpt-4o"));
        assert_eq!(body["messages"][0], json!({ "role": "system", "content": "sys" }));
        assert_eq!(body["messages"][1], json!({ "role": "user", "content": "hi" }));
        assert_eq!(body["messages"][2]["role"], json!("assistant"));
        assert!(body["messages"][2].get("content").is_none());
        assert_eq!(
            body["messages"][2]["tool_calls"][0]["function"]["arguments"],
            json!("{\"content\":\"x\"}")
        );
        assert_eq!(
            body["messages"][3],
            json!({ "role": "tool", "content": "Stored memory k", "tool_call_id": "c1" })
        );
        assert_eq!(body["tools"][0]["type"], json!("function"));
        assert_eq!(body["tools"][0]["function"]["name"], json!("upsert_memory"));
    }

    #[test]
    fn arguments_must_be_objects() {
        assert_eq!(parse_arguments("").expect("empty"), json!({}));
        assert_eq!(
            parse_arguments("{\"content\":\"x\"}").expect("object"),
            json!({ "content": "x" })
        );
        assert!(parse_arguments("[1]").is_err());
        assert!(parse_arguments("{oops").is_err());
    }
}
