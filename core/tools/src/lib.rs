//! Tool declaration, registration, and dispatch.
//!
//! An agent declares the tool names it may call; the [`ToolRegistry`] maps
//! names to [`Tool`] handlers; the [`ToolDispatcher`] executes one step's
//! batch of tool calls against both, enforcing declarations before anything
//! runs. The run-control built-ins (`spawn_agents`, `set_output`,
//! `set_messages`) live in [`builtin`].

pub mod builtin;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod tool;

pub use builtin::builtin_tool_names;
pub use builtin::register_builtin_tools;
pub use context::AgentSpawner;
pub use context::SpawnOutcome;
pub use context::SpawnRequest;
pub use context::ToolContext;
pub use dispatcher::DispatcherConfig;
pub use dispatcher::ToolCallResult;
pub use dispatcher::ToolDispatcher;
pub use error::Result;
pub use error::ToolError;
pub use registry::ToolRegistry;
pub use tool::Tool;
