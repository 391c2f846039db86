//! Events emitted while a run executes.
//!
//! Events are informational only. The runtime never blocks on delivery and a
//! slow or absent subscriber cannot change a run's result. Consumers receive
//! them over an `mpsc` channel supplied when the run starts.

use serde::Deserialize;
use serde::Serialize;

use crate::output::StopReason;

/// An event observed during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    // ========== Run Lifecycle ==========
    /// A run has started.
    RunStarted {
        /// Run identifier.
        run_id: String,
        /// The agent being run.
        agent_id: String,
        /// Identifier of the spawning run, if this is a child.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_run_id: Option<String>,
    },
    /// A run reached a terminal state.
    RunCompleted {
        /// Run identifier.
        run_id: String,
        /// The agent that ran.
        agent_id: String,
        /// Why the run stopped.
        stop_reason: StopReason,
        /// Number of steps consumed.
        steps: u32,
    },
    /// A run failed with an error.
    RunFailed {
        /// Run identifier.
        run_id: String,
        /// The agent that ran.
        agent_id: String,
        /// Rendered error message.
        error: String,
    },

    // ========== Steps ==========
    /// A step began. One step corresponds to one model call.
    StepStarted {
        /// Run identifier.
        run_id: String,
        /// Step number, counted from 1.
        step: u32,
    },
    /// The model responded.
    ModelCallCompleted {
        /// Run identifier.
        run_id: String,
        /// Step number.
        step: u32,
        /// Number of tool calls requested in the response.
        tool_call_count: usize,
        /// Prompt tokens consumed by the call.
        input_tokens: i64,
        /// Completion tokens produced by the call.
        output_tokens: i64,
    },
    /// A transient provider failure is being retried.
    ModelCallRetrying {
        /// Run identifier.
        run_id: String,
        /// Attempt number that failed, counted from 1.
        attempt: u32,
        /// Delay before the next attempt, in milliseconds.
        delay_ms: u64,
        /// Rendered provider error.
        error: String,
    },
    /// Assistant text was appended to the history.
    AssistantMessage {
        /// Run identifier.
        run_id: String,
        /// Step number, 0 for text emitted outside a model turn.
        step: u32,
        /// The text content, empty for tool-call-only responses.
        text: String,
    },

    // ========== Tools ==========
    /// A tool call began executing.
    ToolCallStarted {
        /// Run identifier.
        run_id: String,
        /// Tool call identifier.
        call_id: String,
        /// Tool name.
        name: String,
    },
    /// A tool call finished.
    ToolCallCompleted {
        /// Run identifier.
        run_id: String,
        /// Tool call identifier.
        call_id: String,
        /// Tool name.
        name: String,
        /// Whether the result is an error.
        is_error: bool,
    },

    // ========== Run State ==========
    /// The run's history was replaced wholesale via `set_messages`.
    MessagesReplaced {
        /// Run identifier.
        run_id: String,
        /// Length of the replacement history.
        message_count: usize,
    },
    /// A structured output value was recorded via `set_output`.
    OutputSet {
        /// Run identifier.
        run_id: String,
    },

    // ========== Spawning ==========
    /// A batch of child runs is starting.
    SpawnBatchStarted {
        /// Identifier of the spawning run.
        run_id: String,
        /// Number of children in the batch.
        count: usize,
    },
    /// A batch of child runs finished.
    SpawnBatchCompleted {
        /// Identifier of the spawning run.
        run_id: String,
        /// Children that completed normally.
        succeeded: usize,
        /// Children that failed.
        failed: usize,
    },
}

impl RunEvent {
    /// The run this event belongs to.
    pub fn run_id(&self) -> &str {
        match self {
            RunEvent::RunStarted { run_id, .. }
            | RunEvent::RunCompleted { run_id, .. }
            | RunEvent::RunFailed { run_id, .. }
            | RunEvent::StepStarted { run_id, .. }
            | RunEvent::ModelCallCompleted { run_id, .. }
            | RunEvent::ModelCallRetrying { run_id, .. }
            | RunEvent::AssistantMessage { run_id, .. }
            | RunEvent::ToolCallStarted { run_id, .. }
            | RunEvent::ToolCallCompleted { run_id, .. }
            | RunEvent::MessagesReplaced { run_id, .. }
            | RunEvent::OutputSet { run_id, .. }
            | RunEvent::SpawnBatchStarted { run_id, .. }
            | RunEvent::SpawnBatchCompleted { run_id, .. } => run_id,
        }
    }
}

/// Token usage for a model call or a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub input_tokens: i64,
    /// Tokens in the completion.
    pub output_tokens: i64,
    /// Tokens read from prompt cache (if reported).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<i64>,
}

impl TokenUsage {
    /// Create a new usage record.
    pub fn new(input_tokens: i64, output_tokens: i64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cache_read_tokens: None,
        }
    }

    /// Total tokens used.
    pub fn total(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }

    /// Fold another usage record into this one.
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        if let Some(read) = other.cache_read_tokens {
            *self.cache_read_tokens.get_or_insert(0) += read;
        }
    }
}

#[cfg(test)]
#[path = "run_event.test.rs"]
mod tests;
