//! Output resolution for terminal runs.

use ensemble_protocol::AgentOutput;
use ensemble_protocol::OutputMode;
use ensemble_registry::AgentDefinition;

use crate::error::Result;
use crate::error::run_error;
use crate::state::AgentRunState;

/// Resolve the run's output per the definition's declared output mode.
///
/// Called once the run is terminal. `structured_output` mode fails with
/// [`RunError::MissingStructuredOutput`](crate::RunError::MissingStructuredOutput)
/// when the run never stored a value, so callers can tell "never produced
/// the declared shape" apart from "produced an empty shape".
pub fn resolve_output(definition: &AgentDefinition, state: &AgentRunState) -> Result<AgentOutput> {
    match definition.output_mode {
        OutputMode::LastMessage => Ok(AgentOutput::LastMessage {
            text: state.history.last_assistant_text().unwrap_or_default(),
        }),
        OutputMode::AllMessages => Ok(AgentOutput::AllMessages {
            messages: state.history.messages().to_vec(),
        }),
        OutputMode::StructuredOutput => match &state.structured_output {
            Some(value) => Ok(AgentOutput::Structured {
                value: value.clone(),
            }),
            None => run_error::MissingStructuredOutputSnafu {
                agent_id: definition.id.clone(),
            }
            .fail(),
        },
    }
}

#[cfg(test)]
#[path = "output.test.rs"]
mod tests;
