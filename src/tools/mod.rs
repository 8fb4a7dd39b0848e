//! Tools: the base trait, builtin implementations, and the registry that
//! turns YAML descriptors into live instances.

pub mod base_tool;
pub mod builtin;
pub mod registry;

pub use base_tool::{lock_tool, render_tool_lines, shared, tool_names, BaseTool, SharedTool};
pub use registry::{ToolDescriptor, ToolEntry, ToolRegistry};
