//! Base tool abstractions.
//!
//! Tools are held behind [`SharedTool`] handles so one constructed instance
//! can serve every agent that binds it while still allowing `&mut self`
//! execution and usage counting.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

/// Result type for tool execution.
pub type ToolResult = Result<Value, Box<dyn std::error::Error + Send + Sync>>;

/// Abstract base trait for all tools a pod can bind.
///
/// Implementors must provide `name`, `description`, and `run`. The trait
/// provides default implementations for usage tracking and async execution.
#[async_trait]
pub trait BaseTool: Send + Sync + fmt::Debug {
    /// The unique name of the tool that clearly communicates its purpose.
    fn name(&self) -> &str;

    /// Description used to tell the model how/when/why to use the tool.
    fn description(&self) -> &str;

    /// JSON schema for the arguments that the tool accepts.
    fn args_schema(&self) -> Value {
        Value::Object(serde_json::Map::new())
    }

    /// Whether the tool result should be returned as the final agent answer.
    fn result_as_answer(&self) -> bool {
        false
    }

    /// Maximum number of times this tool can run in one workflow. `None`
    /// means unlimited.
    fn max_usage_count(&self) -> Option<u32> {
        None
    }

    /// Number of times this tool has run in the current workflow.
    fn current_usage_count(&self) -> u32;

    /// Increment the usage count.
    fn increment_usage_count(&mut self);

    /// Reset the usage count to zero. Called at the start of every workflow
    /// run, so counts never leak across runs.
    fn reset_usage_count(&mut self);

    /// Check whether the tool has reached its maximum usage count.
    fn has_reached_max_usage_count(&self) -> bool {
        match self.max_usage_count() {
            Some(max) => self.current_usage_count() >= max,
            None => false,
        }
    }

    /// Synchronous execution of the tool.
    fn run(&mut self, args: HashMap<String, Value>) -> ToolResult;

    /// Asynchronous execution. The default delegates to `run`.
    async fn arun(&mut self, args: HashMap<String, Value>) -> ToolResult {
        self.run(args)
    }
}

/// Shared handle to a constructed tool.
pub type SharedTool = Arc<Mutex<dyn BaseTool>>;

/// Wrap a concrete tool in a [`SharedTool`] handle.
pub fn shared<T: BaseTool + 'static>(tool: T) -> SharedTool {
    Arc::new(Mutex::new(tool))
}

/// Lock a shared tool, recovering the guard if a panic poisoned the mutex.
pub fn lock_tool(tool: &SharedTool) -> MutexGuard<'_, dyn BaseTool + 'static> {
    tool.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Render the tool list block for an agent prompt.
///
/// One line per tool: `- name: description`, followed by an arguments hint
/// when the tool declares a schema.
pub fn render_tool_lines(tools: &[SharedTool]) -> String {
    let mut lines = Vec::new();
    for tool in tools {
        let guard = lock_tool(tool);
        let schema = guard.args_schema();
        let mut line = format!("- {}: {}", guard.name(), guard.description());
        if let Some(object) = schema.as_object() {
            if !object.is_empty() {
                line.push_str(&format!(
                    "\n  Arguments (JSON): {}",
                    serde_json::to_string(&schema).unwrap_or_default()
                ));
            }
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Names of the given tools, in order.
pub fn tool_names(tools: &[SharedTool]) -> Vec<String> {
    tools
        .iter()
        .map(|tool| lock_tool(tool).name().to_string())
        .collect()
}
