//! Concurrent execution of a model reply's tool calls.

use futures_util::future::join_all;
use log::{debug, warn};
use mnema_protocol::{Message, ToolCall};
use mnema_tools::{ToolContext, ToolRegistry, render_tool_output};

/// Run every call in its own task and return one tool message per call.
///
/// Results are appended in call order regardless of completion order.
/// Spawned tasks are detached from the caller, so a cancelled turn does not
/// abort writes that already started.
pub(super) async fn execute_tool_calls(
    registry: &ToolRegistry,
    ctx: &ToolContext,
    calls: &[ToolCall],
) -> Vec<Message> {
    let handles = calls
        .iter()
        .cloned()
        .map(|call| {
            let registry = registry.clone();
            let ctx = ctx.clone().with_tool_call_id(call.id.clone());
            tokio::spawn(async move { registry.invoke(&ctx, &call.name, call.args).await })
        })
        .collect::<Vec<_>>();

    let outcomes = join_all(handles).await;
    calls
        .iter()
        .zip(outcomes)
        .map(|(call, outcome)| {
            let content = match outcome {
                Ok(Ok(output)) => render_tool_output(&output),
                Ok(Err(err)) => {
                    warn!(
                        "tool call failed (thread_id={}, call_id={}, tool={}, err={})",
                        ctx.thread_id, call.id, call.name, err
                    );
                    format!("Error: {err}")
                }
                Err(err) => {
                    warn!(
                        "tool task aborted (thread_id={}, call_id={}, tool={}, err={})",
                        ctx.thread_id, call.id, call.name, err
                    );
                    format!("Error: tool task failed: {err}")
                }
            };
            debug!(
                "tool call finished (thread_id={}, call_id={}, tool={}, content_len={})",
                ctx.thread_id,
                call.id,
                call.name,
                content.len()
            );
            Message::tool_result(call.id.clone(), content)
        })
        .collect()
}
