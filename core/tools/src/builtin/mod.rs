//! Built-in tools available to every agent that declares them.
//!
//! This module provides the run-control built-ins:
//! - [`SpawnAgentsTool`] - Launch child agent runs in parallel
//! - [`SetOutputTool`] - Record the run's structured output
//! - [`SetMessagesTool`] - Replace the run's message history

mod set_messages;
mod set_output;
mod spawn_agents;

pub use set_messages::SetMessagesTool;
pub use set_output::SetOutputTool;
pub use spawn_agents::SpawnAgentsTool;

use crate::registry::ToolRegistry;

/// Register all built-in tools with a registry.
pub fn register_builtin_tools(registry: &mut ToolRegistry) {
    registry.register(SpawnAgentsTool::new());
    registry.register(SetOutputTool::new());
    registry.register(SetMessagesTool::new());
}

/// Get a list of built-in tool names.
pub fn builtin_tool_names() -> Vec<&'static str> {
    vec!["spawn_agents", "set_output", "set_messages"]
}
