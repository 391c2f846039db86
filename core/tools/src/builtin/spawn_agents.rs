//! Built-in tool for launching child agent runs.

use async_trait::async_trait;
use ensemble_protocol::ConcurrencySafety;
use ensemble_protocol::RunEvent;
use ensemble_protocol::ToolOutput;
use serde_json::Value;

use crate::context::AgentSpawner;
use crate::context::SpawnRequest;
use crate::context::ToolContext;
use crate::error::Result;
use crate::tool::Tool;

/// Tool for launching one or more child agent runs in parallel.
///
/// Every requested agent must be in the calling agent's spawnable set; if any
/// is not, the whole batch is rejected before a single child starts. Children
/// run concurrently and the call resolves once all of them have reached a
/// terminal state, reporting per-child success or failure in request order.
pub struct SpawnAgentsTool;

impl SpawnAgentsTool {
    /// Create a new spawn tool.
    pub fn new() -> Self {
        Self
    }
}

impl Default for SpawnAgentsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SpawnAgentsTool {
    fn name(&self) -> &str {
        "spawn_agents"
    }

    fn description(&self) -> &str {
        "Launch one or more agents and wait for all of them to finish. \
         Agents run in parallel; results are returned in request order, \
         with failed agents reported as errors alongside successful ones."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agents": {
                    "type": "array",
                    "description": "The agents to launch",
                    "items": {
                        "type": "object",
                        "properties": {
                            "agent_id": {
                                "type": "string",
                                "description": "ID of the agent to run"
                            },
                            "prompt": {
                                "type": "string",
                                "description": "Task prompt for the child run"
                            },
                            "params": {
                                "type": "object",
                                "description": "Structured parameters, validated against the agent's params schema"
                            }
                        },
                        "required": ["agent_id"]
                    }
                }
            },
            "required": ["agents"]
        })
    }

    fn concurrency_safety(&self) -> ConcurrencySafety {
        ConcurrencySafety::Safe
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> Result<ToolOutput> {
        let agents = input["agents"].as_array().cloned().ok_or_else(|| {
            crate::error::tool_error::InvalidInputSnafu {
                message: "agents must be an array",
            }
            .build()
        })?;

        let requests: Vec<SpawnRequest> = agents
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<_, _>>()?;

        if requests.is_empty() {
            return Ok(ToolOutput::structured(serde_json::json!([])));
        }

        // Reject the whole batch before any child starts if any requested
        // agent is outside the spawnable set.
        let undeclared: Vec<String> = requests
            .iter()
            .filter(|r| !ctx.can_spawn(&r.agent_id))
            .map(|r| r.agent_id.clone())
            .collect();
        if !undeclared.is_empty() {
            return Err(crate::error::tool_error::SpawnNotDeclaredSnafu {
                agent_ids: undeclared,
            }
            .build());
        }

        let Some(spawner) = ctx.spawner.clone() else {
            let ids: Vec<&str> = requests.iter().map(|r| r.agent_id.as_str()).collect();
            return Ok(ToolOutput::text(format!(
                "Requested agent runs: {}\n\n[no spawner connected - returning stub response]",
                ids.join(", ")
            )));
        };

        ctx.emit_event(RunEvent::SpawnBatchStarted {
            run_id: ctx.run_id.to_string(),
            count: requests.len(),
        })
        .await;

        let outcomes = spawner.spawn_many(requests).await;

        let failed = outcomes.iter().filter(|o| o.is_failed()).count();
        ctx.emit_event(RunEvent::SpawnBatchCompleted {
            run_id: ctx.run_id.to_string(),
            succeeded: outcomes.len() - failed,
            failed,
        })
        .await;

        Ok(ToolOutput::structured(serde_json::to_value(&outcomes)?))
    }
}

#[cfg(test)]
#[path = "spawn_agents.test.rs"]
mod tests;
