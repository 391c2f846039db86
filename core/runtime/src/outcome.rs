//! Caller-facing input and result types.

use ensemble_protocol::AgentOutput;
use ensemble_protocol::Message;
use ensemble_protocol::StopReason;
use ensemble_protocol::TokenUsage;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Input for starting an agent run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInput {
    /// Task prompt for the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Structured input, validated against the agent's input schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RunInput {
    /// Create an input carrying just a prompt.
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            params: None,
        }
    }

    /// Set the structured params.
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// Result of a completed agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Id of the run that produced this outcome.
    pub run_id: String,
    /// Agent that ran.
    pub agent_id: String,
    /// Output resolved per the agent's declared output mode.
    pub output: AgentOutput,
    /// How the run reached its terminal state.
    pub stop_reason: StopReason,
    /// Model calls made.
    pub steps: u32,
    /// Token usage accumulated across all steps.
    pub usage: TokenUsage,
    /// Final message history, reflecting any replacement.
    pub messages: Vec<Message>,
}
