//! Error types for agent registration and resolution.

use snafu::Location;
use snafu::Snafu;

/// Registry errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum RegistryError {
    /// No agent with the given ID, even after namespace fallback.
    #[snafu(display("Unknown agent: {agent_id}"))]
    UnknownAgent {
        agent_id: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Two definitions share the same ID.
    #[snafu(display("Duplicate agent ID: {agent_id}"))]
    DuplicateAgent {
        agent_id: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// A definition failed validation.
    #[snafu(display("Invalid agent definition '{agent_id}': {message}"))]
    InvalidDefinition {
        agent_id: String,
        message: String,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
