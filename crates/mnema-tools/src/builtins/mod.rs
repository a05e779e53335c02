//! Built-in tools bundled with Mnema.

mod memory;
mod utils;

use crate::ToolRegistry;
use log::info;
use std::sync::Arc;

pub use memory::{UPSERT_MEMORY_TOOL, UpsertMemoryTool};

/// Register the memory tools with the provided registry.
pub fn register_memory_tools(registry: &ToolRegistry) {
    registry.register(Arc::new(UpsertMemoryTool));
    info!("registered memory tools");
}

/// Build a registry pre-populated with the memory tools.
pub fn memory_tool_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    register_memory_tools(&registry);
    registry
}
