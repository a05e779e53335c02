//! Test helpers shared across Mnema crates.

pub mod events;
pub mod memory;
pub mod model;

pub use events::RecordingEventSink;
pub use memory::{DelayedMemoryStore, FailingMemoryStore};
pub use model::{
    AlwaysToolCallModel, FailingModel, MemoryEchoModel, ScriptedModel, SlowModel, upsert_call,
};
