//! End-to-end conversation scenarios across turns, threads, and restarts.

use mnema_config::{MnemaConfig, StoreProvider};
use mnema_core::{CheckpointStore, Context, JsonCheckpointStore, MemoryAgent, MemoryAgentBuilder};
use mnema_memory::{FileMemoryStore, MemoryStore, Namespace};
use mnema_protocol::Role;
use mnema_test_utils::{MemoryEchoModel, ScriptedModel};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::tempdir;

/// A fact stored in one thread is recalled in a new thread of the same user.
#[tokio::test]
async fn favorite_color_is_remembered_across_threads() {
    let model = MemoryEchoModel::new();
    let agent = MemoryAgent::builder(Arc::new(model.clone()))
        .build()
        .expect("agent");

    let first = Context::new("alice");
    let state = agent
        .chat("remember My favorite color is blue", &first)
        .await
        .expect("store turn");
    assert_eq!(state.len(), 4);
    assert_eq!(state.last_message().expect("reply").content, "Noted.");

    let second = Context::new("alice");
    assert_ne!(second.thread_id, first.thread_id);
    let state = agent
        .chat("What is my favorite color?", &second)
        .await
        .expect("recall turn");
    let reply = &state.last_message().expect("reply").content;
    assert!(reply.contains("<memories>"));
    assert!(reply.contains("My favorite color is blue"));
    assert!(reply.contains("(similarity: "));
    assert_eq!(state.len(), 2);
}

/// Memories never leak between users.
#[tokio::test]
async fn memories_are_partitioned_by_user() {
    let agent = MemoryAgent::builder(Arc::new(MemoryEchoModel::new()))
        .build()
        .expect("agent");
    agent
        .chat("remember My favorite color is blue", &Context::new("alice"))
        .await
        .expect("store turn");

    let state = agent
        .chat("What is my favorite color?", &Context::new("bob"))
        .await
        .expect("recall turn");
    let reply = &state.last_message().expect("reply").content;
    assert!(!reply.contains("<memories>"));
}

/// Sequential turns share one thread and one checkpoint entry.
#[tokio::test]
async fn sequential_turns_share_thread() {
    let model = ScriptedModel::new([
        mnema_protocol::Message::model("first"),
        mnema_protocol::Message::model("second"),
    ]);
    let agent = MemoryAgent::builder(Arc::new(model.clone()))
        .build()
        .expect("agent");
    let ctx = Context::new("u1");

    agent.chat("one", &ctx).await.expect("turn one");
    let state = agent.chat("two", &ctx).await.expect("turn two");

    assert_eq!(state.thread_id, ctx.thread_id);
    let contents = state
        .messages()
        .iter()
        .map(|message| message.content.as_str())
        .collect::<Vec<_>>();
    assert_eq!(contents, vec!["one", "first", "two", "second"]);
    assert_eq!(model.requests()[1].messages.len(), 3);

    let threads = agent.checkpoint_store().list_threads().expect("list");
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].thread_id, ctx.thread_id);
    assert_eq!(threads[0].message_count, 4);

    let fresh = Context::new("u1");
    assert!(
        agent
            .checkpoint_store()
            .load(&fresh.thread_id)
            .expect("load")
            .is_empty()
    );
}

/// File-backed stores let a conversation resume after a restart.
#[tokio::test]
async fn conversation_resumes_after_restart() {
    let temp = tempdir().expect("tempdir");
    let ctx = Context::new("alice").with_thread_id("session-restart");
    {
        let agent = MemoryAgent::builder(Arc::new(MemoryEchoModel::new()))
            .memory_store(Arc::new(
                FileMemoryStore::new(temp.path().join("memories")).expect("memory"),
            ))
            .checkpoint_store(Arc::new(
                JsonCheckpointStore::new(temp.path().join("checkpoints")).expect("checkpoints"),
            ))
            .build()
            .expect("agent");
        agent
            .chat("remember I live in Lisbon", &ctx)
            .await
            .expect("store turn");
    }

    let config = MnemaConfig::default();
    assert_eq!(config.memory.provider, StoreProvider::File);
    let agent = MemoryAgentBuilder::from_config(Arc::new(MemoryEchoModel::new()), &config, temp.path())
        .expect("builder")
        .build()
        .expect("agent");
    let state = agent
        .chat("Where do I live?", &ctx)
        .await
        .expect("resume turn");

    assert_eq!(state.len(), 6);
    assert_eq!(state.messages()[0].content, "remember I live in Lisbon");
    assert_eq!(state.messages()[2].role, Role::Tool);
    assert!(state
        .last_message()
        .expect("reply")
        .content
        .contains("I live in Lisbon"));
    let stored = agent
        .memory_store()
        .list(&Namespace::memories("alice"))
        .await
        .expect("list");
    assert_eq!(stored.len(), 1);
}

/// Config-selected in-memory stores need no data directory on disk.
#[tokio::test]
async fn in_memory_providers_from_config() {
    let temp = tempdir().expect("tempdir");
    let config = MnemaConfig::load_from_str(
        r#"{ memory: { provider: "memory" }, checkpoints: { provider: "memory" }, agent: { max_iterations: 2 } }"#,
    )
    .expect("config");
    let builder = MemoryAgentBuilder::from_config(
        Arc::new(MemoryEchoModel::new()),
        &config,
        temp.path().join("unused"),
    )
    .expect("builder");
    let agent = builder.build().expect("agent");

    assert_eq!(agent.settings().max_iterations, 2);
    agent
        .chat("hello", &Context::from_config("u1", &config.agent))
        .await
        .expect("turn");
    assert!(!temp.path().join("unused").exists());
}
