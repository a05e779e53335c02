//! Tool interfaces and the memory persistence tool for Mnema.

pub mod builtins;
pub mod context;
pub mod registry;
pub mod tool;

/// Memory tool and registry helpers.
pub use builtins::{UpsertMemoryTool, memory_tool_registry, register_memory_tools};
/// Tool execution context.
pub use context::ToolContext;
/// Tool registry type.
pub use registry::ToolRegistry;
/// Tool trait and spec type.
pub use tool::{Tool, ToolSpec, render_tool_output};
