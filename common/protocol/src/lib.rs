//! Shared protocol types for the ensemble agent runtime.
//!
//! This crate defines the vocabulary the rest of the workspace speaks:
//! conversation [`Message`]s, tool call types, run events, output modes,
//! and the lightweight JSON schema checks used for agent and tool inputs.
//! It is dependency-light so every other crate can build on it.

pub mod message;
pub mod output;
pub mod run_event;
pub mod run_id;
pub mod schema;
pub mod tool_types;

pub use message::ContentPart;
pub use message::Message;
pub use message::Role;
pub use output::AgentOutput;
pub use output::OutputMode;
pub use output::StopReason;
pub use run_event::RunEvent;
pub use run_event::TokenUsage;
pub use run_id::RunId;
pub use schema::validate_against_schema;
pub use tool_types::ConcurrencySafety;
pub use tool_types::RunModifier;
pub use tool_types::ToolCall;
pub use tool_types::ToolDefinition;
pub use tool_types::ToolOutput;
pub use tool_types::ToolResultContent;
pub use tool_types::ValidationError;
pub use tool_types::ValidationResult;
