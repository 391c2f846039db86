//! Error types for tool dispatch and execution.

use snafu::Location;
use snafu::Snafu;

/// Tool dispatch and execution errors.
///
/// Capability violations (`NotDeclared`, `SpawnNotDeclared`) and missing
/// handlers (`NotFound`) abort the run that raised them. Everything else
/// is a tool-level failure that flows back to the model as an error-typed
/// tool result, so agent logic can react to it.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum ToolError {
    /// Tool was called but is not in the agent's declared tool set.
    #[snafu(display("Tool not declared by agent: {name}"))]
    NotDeclared {
        name: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Spawn batch referenced agents outside the declared spawnable set.
    #[snafu(display("Agents not declared as spawnable: {}", agent_ids.join(", ")))]
    SpawnNotDeclared {
        agent_ids: Vec<String>,
        #[snafu(implicit)]
        location: Location,
    },

    /// Tool is declared but no handler is registered for it.
    #[snafu(display("Tool not found: {name}"))]
    NotFound {
        name: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Invalid input for tool.
    #[snafu(display("Invalid input: {message}"))]
    InvalidInput {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Tool execution failed.
    #[snafu(display("Execution failed: {message}"))]
    ExecutionFailed {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Tool execution timed out.
    #[snafu(display("Timeout after {timeout_secs}s"))]
    Timeout {
        timeout_secs: i64,
        #[snafu(implicit)]
        location: Location,
    },

    /// Internal error.
    #[snafu(display("Internal error: {message}"))]
    Internal {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Tool execution was cancelled via CancellationToken.
    #[snafu(display("Cancelled"))]
    Cancelled {
        #[snafu(implicit)]
        location: Location,
    },
}

impl ToolError {
    /// Check if this error is a capability violation that must abort the
    /// run instead of flowing back to the model as a tool result.
    pub fn is_capability_violation(&self) -> bool {
        matches!(
            self,
            ToolError::NotDeclared { .. }
                | ToolError::SpawnNotDeclared { .. }
                | ToolError::NotFound { .. }
        )
    }

    /// Check if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Cancelled { .. })
    }

    /// Convert to tool output error message.
    pub fn to_output_message(&self) -> String {
        self.to_string()
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        tool_error::InvalidInputSnafu {
            message: format!("JSON error: {err}"),
        }
        .build()
    }
}

/// Result type for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

#[cfg(test)]
#[path = "error.test.rs"]
mod tests;
