//! Declarative agent definitions.

use ensemble_protocol::OutputMode;
use ensemble_protocol::ValidationResult;
use ensemble_protocol::validate_against_schema;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::error::registry_error;

/// Declarative definition of an agent.
///
/// A definition carries everything the runtime needs to execute the agent
/// except code: which model to call, the prompts, the tools it may use, and
/// which other agents it may spawn. Step programs are attached separately at
/// runner construction because they are code, not data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique identifier, optionally namespace-qualified (e.g. "team/researcher").
    pub id: String,

    /// Human-readable name; falls back to `id` when absent.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Model identifier passed to the provider.
    pub model: String,

    /// System prompt for every model call in a run.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Instructions appended to the caller's prompt in the initial user
    /// message.
    #[serde(default)]
    pub instructions_prompt: Option<String>,

    /// JSON schema for structured run params. When present, params are
    /// validated before the run starts.
    #[serde(default)]
    pub input_schema: Option<Value>,

    /// How the run's final output is derived.
    #[serde(default)]
    pub output_mode: OutputMode,

    /// JSON schema for structured output. Required when `output_mode` is
    /// `structured_output`.
    #[serde(default)]
    pub output_schema: Option<Value>,

    /// Names of tools this agent may call. Calls outside this set fail the
    /// run even if a handler is registered.
    #[serde(default)]
    pub tools: Vec<String>,

    /// IDs of agents this one may spawn via `spawn_agents`.
    #[serde(default)]
    pub spawnable_agents: Vec<String>,

    /// When this agent runs as a spawned child, seed its history with a copy
    /// of the parent's messages. Off by default; children start fresh.
    #[serde(default)]
    pub include_message_history: bool,

    /// When this agent runs as a spawned child and declares no system prompt
    /// of its own, use the parent's.
    #[serde(default)]
    pub inherit_system_prompt: bool,

    /// Per-agent override of the runtime's step budget.
    #[serde(default)]
    pub max_steps: Option<u32>,
}

impl AgentDefinition {
    /// Create a minimal definition with defaults for everything optional.
    pub fn new(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            model: model.into(),
            system_prompt: None,
            instructions_prompt: None,
            input_schema: None,
            output_mode: OutputMode::default(),
            output_schema: None,
            tools: Vec::new(),
            spawnable_agents: Vec::new(),
            include_message_history: false,
            inherit_system_prompt: false,
            max_steps: None,
        }
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the instructions prompt.
    pub fn with_instructions_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.instructions_prompt = Some(prompt.into());
        self
    }

    /// Set the declared tool names.
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Set the spawnable agent IDs.
    pub fn with_spawnable_agents(
        mut self,
        agents: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.spawnable_agents = agents.into_iter().map(Into::into).collect();
        self
    }

    /// Set the input schema.
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Set the output mode.
    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    /// Set the output schema.
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Set the per-agent step budget.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// The display name, falling back to the ID.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// Check whether a tool name is in the declared set.
    pub fn declares_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }

    /// Check whether an agent ID is in the spawnable set.
    pub fn can_spawn(&self, agent_id: &str) -> bool {
        self.spawnable_agents.iter().any(|a| a == agent_id)
    }

    /// Validate structured params against the input schema.
    ///
    /// With no schema declared, any params (including none) are accepted.
    pub fn validate_params(&self, params: Option<&Value>) -> ValidationResult {
        match &self.input_schema {
            None => ValidationResult::Valid,
            Some(schema) => {
                let value = params.cloned().unwrap_or(Value::Null);
                validate_against_schema(&value, schema)
            }
        }
    }

    /// Check internal consistency of the definition.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(registry_error::InvalidDefinitionSnafu {
                agent_id: self.id.clone(),
                message: "agent ID must not be empty".to_string(),
            }
            .build());
        }
        if self.model.trim().is_empty() {
            return Err(registry_error::InvalidDefinitionSnafu {
                agent_id: self.id.clone(),
                message: "model must not be empty".to_string(),
            }
            .build());
        }
        if self.output_mode == OutputMode::StructuredOutput && self.output_schema.is_none() {
            return Err(registry_error::InvalidDefinitionSnafu {
                agent_id: self.id.clone(),
                message: "structured_output mode requires an output_schema".to_string(),
            }
            .build());
        }
        for schema in [&self.input_schema, &self.output_schema].into_iter().flatten() {
            if !schema.is_object() {
                return Err(registry_error::InvalidDefinitionSnafu {
                    agent_id: self.id.clone(),
                    message: "schemas must be JSON objects".to_string(),
                }
                .build());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "definition.test.rs"]
mod tests;
