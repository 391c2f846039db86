//! The caller-facing error taxonomy for agent runs.
//!
//! A `RunError` means the run itself failed: the engine could not (or
//! refused to) carry it to a terminal state. Task-level problems, such as
//! a collaborator tool returning an error, flow back to the model in-band
//! and never appear here.

use ensemble_provider::ProviderError;
use ensemble_tools::ToolError;
use snafu::IntoError;
use snafu::Location;
use snafu::Snafu;

/// Errors that fail an agent run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum RunError {
    /// Requested agent is not in the registry.
    #[snafu(display("Unknown agent: {agent_id}"))]
    UnknownAgent {
        agent_id: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Model called a tool outside the agent's declared set.
    #[snafu(display("Tool not declared by agent: {name}"))]
    ToolNotDeclared {
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

    /// Run input failed validation against the agent's input schema.
    #[snafu(display("Schema validation failed for {agent_id}: {message}"))]
    SchemaValidation {
        agent_id: String,
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Model call failed after retries.
    #[snafu(display("Provider call failed: {source}"))]
    Provider {
        source: ProviderError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Engine-level tool failure, e.g. a declared tool with no handler.
    #[snafu(display("Tool {name} failed: {source}"))]
    Tool {
        name: String,
        source: ToolError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Agent in `structured_output` mode finished without calling
    /// `set_output`.
    #[snafu(display("Agent {agent_id} finished without setting structured output"))]
    MissingStructuredOutput {
        agent_id: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// The run was cancelled via its CancellationToken.
    #[snafu(display("Run cancelled"))]
    Cancelled {
        #[snafu(implicit)]
        location: Location,
    },
}

impl RunError {
    /// Check if this error is a capability violation.
    pub fn is_capability_violation(&self) -> bool {
        matches!(
            self,
            RunError::UnknownAgent { .. }
                | RunError::ToolNotDeclared { .. }
                | RunError::SpawnNotDeclared { .. }
        )
    }

    /// Check if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled { .. })
    }
}

/// Lift a dispatch-level error into the run taxonomy.
///
/// Capability violations and cancellation map to their dedicated variants;
/// everything else keeps the tool error as source under `RunError::Tool`.
pub(crate) fn run_error_from_tool(call_name: &str, error: ToolError) -> RunError {
    match error {
        ToolError::NotDeclared { name, .. } => run_error::ToolNotDeclaredSnafu { name }.build(),
        ToolError::SpawnNotDeclared { agent_ids, .. } => {
            run_error::SpawnNotDeclaredSnafu { agent_ids }.build()
        }
        ToolError::Cancelled { .. } => run_error::CancelledSnafu.build(),
        ToolError::NotFound { ref name, .. } => {
            let name = name.clone();
            run_error::ToolSnafu { name }.into_error(error)
        }
        other => run_error::ToolSnafu {
            name: call_name.to_string(),
        }
        .into_error(other),
    }
}

/// Result type for run operations.
pub type Result<T> = std::result::Result<T, RunError>;

#[cfg(test)]
#[path = "error.test.rs"]
mod tests;
