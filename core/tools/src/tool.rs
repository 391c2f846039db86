//! Tool trait definition.
//!
//! This module defines the [`Tool`] trait that all tools must implement.
//! The dispatcher runs each call through a short pipeline: validate the
//! input against the tool's schema, execute, then truncate oversized
//! output.

use async_trait::async_trait;
use ensemble_protocol::ConcurrencySafety;
use ensemble_protocol::ToolDefinition;
use ensemble_protocol::ToolOutput;
use ensemble_protocol::ValidationResult;
use ensemble_protocol::validate_against_schema;
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::Result;

/// A tool that can be invoked by an agent.
///
/// # Concurrency Safety
///
/// Tools declare their concurrency safety via
/// [`concurrency_safety`](Tool::concurrency_safety):
/// - `Safe` - Can run in parallel with other tools
/// - `Unsafe` - Must run sequentially (e.g., tools that mutate run state)
///
/// # Example
///
/// ```ignore
/// use ensemble_tools::{Tool, ToolContext};
/// use ensemble_protocol::ToolOutput;
/// use async_trait::async_trait;
///
/// struct EchoTool;
///
/// #[async_trait]
/// impl Tool for EchoTool {
///     fn name(&self) -> &str { "echo" }
///     fn description(&self) -> &str { "Echo the message back" }
///     fn input_schema(&self) -> serde_json::Value {
///         serde_json::json!({
///             "type": "object",
///             "properties": {
///                 "message": {"type": "string"}
///             },
///             "required": ["message"]
///         })
///     }
///
///     async fn execute(
///         &self,
///         input: serde_json::Value,
///         _ctx: &mut ToolContext,
///     ) -> ensemble_tools::Result<ToolOutput> {
///         let message = input["message"].as_str().unwrap_or_default();
///         Ok(ToolOutput::text(message))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get the tool description.
    fn description(&self) -> &str;

    /// Get the JSON schema for tool input.
    fn input_schema(&self) -> Value;

    /// Get the concurrency safety of this tool.
    ///
    /// Default is `Safe` - tools can run in parallel.
    /// Override to return `Unsafe` for tools that mutate run state.
    fn concurrency_safety(&self) -> ConcurrencySafety {
        ConcurrencySafety::Safe
    }

    /// Validate the input before execution.
    ///
    /// Default implementation checks the input against
    /// [`input_schema`](Tool::input_schema).
    async fn validate(&self, input: &Value) -> ValidationResult {
        validate_against_schema(input, &self.input_schema())
    }

    /// Execute the tool with the given input.
    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> Result<ToolOutput>;

    /// Convert to a tool definition for the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::full(self.name(), self.description(), self.input_schema())
    }

    /// Check if this tool is safe to run concurrently.
    fn is_concurrent_safe(&self) -> bool {
        matches!(self.concurrency_safety(), ConcurrencySafety::Safe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyTool;

    #[async_trait]
    impl Tool for DummyTool {
        fn name(&self) -> &str {
            "dummy"
        }

        fn description(&self) -> &str {
            "A dummy tool for testing"
        }

        fn input_schema(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string"}
                },
                "required": ["message"]
            })
        }

        async fn execute(&self, input: Value, _ctx: &mut ToolContext) -> Result<ToolOutput> {
            let message = input["message"]
                .as_str()
                .ok_or_else(|| crate::error::tool_error::InvalidInputSnafu {
                    message: "message must be a string",
                }
                .build())?;
            Ok(ToolOutput::text(format!("Received: {message}")))
        }
    }

    #[tokio::test]
    async fn test_tool_trait() {
        let tool = DummyTool;
        assert_eq!(tool.name(), "dummy");
        assert!(tool.is_concurrent_safe());
    }

    #[tokio::test]
    async fn test_default_validation_uses_schema() {
        let tool = DummyTool;

        let valid = serde_json::json!({"message": "hello"});
        assert!(matches!(
            tool.validate(&valid).await,
            ValidationResult::Valid
        ));

        // Missing required field
        let missing = serde_json::json!({});
        assert!(matches!(
            tool.validate(&missing).await,
            ValidationResult::Invalid { .. }
        ));

        // Wrong type for a declared property
        let wrong_type = serde_json::json!({"message": 42});
        assert!(matches!(
            tool.validate(&wrong_type).await,
            ValidationResult::Invalid { .. }
        ));
    }

    #[test]
    fn test_to_definition() {
        let tool = DummyTool;
        let def = tool.to_definition();
        assert_eq!(def.name, "dummy");
        assert!(def.description.is_some());
    }
}
