//! Memory persistence tool exposed to the model.

use crate::builtins::utils::parse_args;
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use log::{debug, warn};
use mnema_protocol::ToolError;
use serde::Deserialize;
use serde_json::{Value, json};

/// Name under which the model sees the upsert tool.
pub const UPSERT_MEMORY_TOOL: &str = "upsert_memory";

/// Tool that inserts or overwrites a memory in the caller's namespace.
#[derive(Debug, Default)]
pub struct UpsertMemoryTool;

#[derive(Debug, Deserialize)]
struct UpsertMemoryArgs {
    /// Fact to remember.
    content: String,
    /// Existing key to overwrite.
    #[serde(default)]
    key: Option<String>,
}

#[async_trait]
impl Tool for UpsertMemoryTool {
    fn name(&self) -> &str {
        UPSERT_MEMORY_TOOL
    }

    fn description(&self) -> &str {
        "Store a fact about the user in long-term memory. Pass `key` to overwrite an existing memory."
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The fact to remember about the user."
                },
                "key": {
                    "type": "string",
                    "description": "Key of an existing memory to update."
                }
            },
            "required": ["content"],
            "additionalProperties": false
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: UpsertMemoryArgs = parse_args(args)?;
        let namespace = ctx.namespace();
        let confirmation = ctx
            .store
            .upsert(&namespace, input.key.as_deref(), &input.content)
            .await
            .map_err(|err| {
                warn!(
                    "memory upsert failed (user_id={}, thread_id={}, err={})",
                    ctx.user_id, ctx.thread_id, err
                );
                ToolError::ExecutionFailed(err.to_string())
            })?;
        debug!(
            "upsert_memory completed (user_id={}, thread_id={}, call_id={:?})",
            ctx.user_id, ctx.thread_id, ctx.tool_call_id
        );
        Ok(Value::String(confirmation))
    }
}

#[cfg(test)]
mod tests {
    use super::UpsertMemoryTool;
    use crate::{Tool, ToolContext};
    use mnema_memory::{InMemoryStore, MemoryStore, Namespace, derive_key};
    use mnema_protocol::ToolError;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[tokio::test]
    async fn stores_memory_in_user_namespace() {
        let store = Arc::new(InMemoryStore::new());
        let ctx = ToolContext::new("u1", "t1", store.clone());
        let output = UpsertMemoryTool
            .call(&ctx, json!({ "content": "User's favorite color is blue" }))
            .await
            .expect("call");
        let key = derive_key("User's favorite color is blue");
        assert_eq!(output, Value::String(format!("Stored memory {key}")));

        let record = store
            .get(&Namespace::memories("u1"), &key)
            .await
            .expect("get")
            .expect("record");
        assert_eq!(record.value, "User's favorite color is blue");
    }

    #[tokio::test]
    async fn explicit_key_overwrites() {
        let store = Arc::new(InMemoryStore::new());
        let ctx = ToolContext::new("u1", "t1", store.clone());
        for value in ["blue", "green"] {
            UpsertMemoryTool
                .call(&ctx, json!({ "content": value, "key": "color" }))
                .await
                .expect("call");
        }
        let records = store.list(&Namespace::memories("u1")).await.expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, "green");
    }

    #[tokio::test]
    async fn missing_content_is_invalid() {
        let ctx = ToolContext::new("u1", "t1", Arc::new(InMemoryStore::new()));
        let err = UpsertMemoryTool
            .call(&ctx, json!({ "key": "color" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn empty_content_fails_execution() {
        let ctx = ToolContext::new("u1", "t1", Arc::new(InMemoryStore::new()));
        let err = UpsertMemoryTool
            .call(&ctx, json!({ "content": "   " }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
    }
}
