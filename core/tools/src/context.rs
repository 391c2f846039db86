//! Tool execution context.
//!
//! This module provides [`ToolContext`], which carries everything a tool
//! needs during execution: call identification, the event channel,
//! cancellation support, and the collaborator seam for launching child
//! agent runs.

use std::sync::Arc;

use async_trait::async_trait;
use ensemble_protocol::AgentOutput;
use ensemble_protocol::RunEvent;
use ensemble_protocol::RunId;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One child run request passed to the spawner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Registered agent to run.
    pub agent_id: String,
    /// User prompt for the child run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Structured input validated against the child's input schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Result of one child run, reported in request order.
///
/// Child failures are carried in-band so one failing child never
/// disturbs its siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SpawnOutcome {
    /// Child completed and produced an output.
    Completed {
        agent_id: String,
        output: AgentOutput,
    },
    /// Child failed; the error stands in for its output.
    Failed { agent_id: String, error: String },
}

impl SpawnOutcome {
    /// The agent the outcome belongs to.
    pub fn agent_id(&self) -> &str {
        match self {
            SpawnOutcome::Completed { agent_id, .. } | SpawnOutcome::Failed { agent_id, .. } => {
                agent_id
            }
        }
    }

    /// Check if this child failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, SpawnOutcome::Failed { .. })
    }
}

/// Collaborator that launches child agent runs.
///
/// Implemented by the runtime. The `spawn_agents` builtin authorizes the
/// batch against the declared spawnable set, then forwards it through
/// this seam.
#[async_trait]
pub trait AgentSpawner: Send + Sync {
    /// Launch all requests concurrently and return one outcome per
    /// request, in request order.
    async fn spawn_many(&self, requests: Vec<SpawnRequest>) -> Vec<SpawnOutcome>;
}

/// Context for tool execution.
#[derive(Clone)]
pub struct ToolContext {
    /// Unique call ID for this execution.
    pub call_id: String,
    /// Run that issued the call.
    pub run_id: RunId,
    /// Agent the run belongs to.
    pub agent_id: String,
    /// Channel for emitting run events.
    pub event_tx: Option<mpsc::Sender<RunEvent>>,
    /// Cancellation token for aborting execution.
    pub cancel_token: CancellationToken,
    /// Output schema of the calling agent, if declared.
    pub output_schema: Option<Value>,
    /// Agent ids the calling agent may spawn.
    pub spawnable_agents: Vec<String>,
    /// Collaborator for launching child runs.
    pub spawner: Option<Arc<dyn AgentSpawner>>,
}

impl ToolContext {
    /// Create a new tool context.
    pub fn new(call_id: impl Into<String>, run_id: RunId, agent_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            run_id,
            agent_id: agent_id.into(),
            event_tx: None,
            cancel_token: CancellationToken::new(),
            output_schema: None,
            spawnable_agents: Vec::new(),
            spawner: None,
        }
    }

    /// Set the event channel.
    pub fn with_event_tx(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Set the cancellation token.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Set the calling agent's output schema.
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Set the declared spawnable agents.
    pub fn with_spawnable_agents(mut self, agent_ids: Vec<String>) -> Self {
        self.spawnable_agents = agent_ids;
        self
    }

    /// Set the spawner collaborator.
    pub fn with_spawner(mut self, spawner: Arc<dyn AgentSpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Emit a run event.
    pub async fn emit_event(&self, event: RunEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Wait for cancellation.
    pub async fn cancelled(&self) {
        self.cancel_token.cancelled().await;
    }

    /// Check whether the calling agent declared `agent_id` as spawnable.
    pub fn can_spawn(&self, agent_id: &str) -> bool {
        self.spawnable_agents.iter().any(|a| a == agent_id)
    }
}

#[cfg(test)]
#[path = "context.test.rs"]
mod tests;
