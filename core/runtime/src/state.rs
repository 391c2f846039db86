//! Per-run mutable state.

use std::sync::Arc;

use ensemble_message::MessageHistory;
use ensemble_protocol::RunId;
use ensemble_protocol::StopReason;
use ensemble_protocol::TokenUsage;
use ensemble_registry::AgentDefinition;
use serde_json::Value;

/// Mutable state of one agent run.
///
/// Created when the run starts and owned exclusively by the driving
/// future; nothing here is shared between runs.
#[derive(Debug)]
pub struct AgentRunState {
    /// Unique id of this run.
    pub run_id: RunId,
    /// Definition the run executes.
    pub definition: Arc<AgentDefinition>,
    /// Structured input bound at start, already validated.
    pub params: Option<Value>,
    /// Effective system prompt: the definition's own, or the parent's
    /// when the definition opts into inheritance.
    pub system_prompt: Option<String>,
    /// The conversation so far.
    pub history: MessageHistory,
    /// Model calls made so far.
    pub steps: u32,
    /// Set once the run reaches a terminal state.
    pub stop_reason: Option<StopReason>,
    /// Value stored by the most recent successful `set_output`.
    pub structured_output: Option<Value>,
    /// Token usage accumulated across steps.
    pub usage: TokenUsage,
}

impl AgentRunState {
    /// Create fresh state for a run of the given definition.
    pub fn new(definition: Arc<AgentDefinition>) -> Self {
        Self {
            run_id: RunId::new(),
            definition,
            params: None,
            system_prompt: None,
            history: MessageHistory::new(),
            steps: 0,
            stop_reason: None,
            structured_output: None,
            usage: TokenUsage::default(),
        }
    }

    /// The step budget for this run: the definition's override when
    /// present, else the given configured default.
    pub fn step_budget(&self, config_max_steps: u32) -> u32 {
        self.definition.max_steps.unwrap_or(config_max_steps)
    }
}
