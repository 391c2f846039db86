//! Output modes and resolved run outputs.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use strum::Display;

use crate::message::Message;

/// How a run's final output is derived from its terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputMode {
    /// The text of the final assistant message.
    #[default]
    LastMessage,
    /// Every message appended during the run, in order.
    AllMessages,
    /// The value recorded via `set_output`, validated against the agent's
    /// output schema.
    StructuredOutput,
}

/// Why a run reached a terminal state.
///
/// Every variant here is a normal completion. Failures are reported through
/// the run error type instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    /// The model responded without requesting any tools.
    ModelStop,
    /// The step budget was reached. Output is still resolved best-effort.
    StepBudgetExhausted,
    /// The agent's step program ran to completion.
    ProgramComplete,
}

/// The resolved output of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentOutput {
    /// Text of the final assistant message, empty if none was produced.
    LastMessage {
        /// The concatenated text content.
        text: String,
    },
    /// The full message log of the run.
    AllMessages {
        /// Messages in append order.
        messages: Vec<Message>,
    },
    /// A structured value recorded by the agent.
    Structured {
        /// The recorded value.
        value: Value,
    },
}

impl AgentOutput {
    /// Get the text if this is a last-message output.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AgentOutput::LastMessage { text } => Some(text),
            _ => None,
        }
    }

    /// Get the value if this is a structured output.
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            AgentOutput::Structured { value } => Some(value),
            _ => None,
        }
    }

    /// Get the messages if this is an all-messages output.
    pub fn as_messages(&self) -> Option<&[Message]> {
        match self {
            AgentOutput::AllMessages { messages } => Some(messages),
            _ => None,
        }
    }

    /// Render the output as text for embedding in a parent conversation.
    pub fn to_text(&self) -> String {
        match self {
            AgentOutput::LastMessage { text } => text.clone(),
            AgentOutput::AllMessages { messages } => messages
                .iter()
                .map(Message::text)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            AgentOutput::Structured { value } => value.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "output.test.rs"]
mod tests;
