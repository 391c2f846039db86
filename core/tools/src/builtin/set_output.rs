//! Built-in tool for recording a run's structured output.

use async_trait::async_trait;
use ensemble_protocol::ConcurrencySafety;
use ensemble_protocol::RunModifier;
use ensemble_protocol::ToolOutput;
use ensemble_protocol::ValidationResult;
use ensemble_protocol::validate_against_schema;
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::Result;
use crate::tool::Tool;

/// Tool for storing the run's structured output value.
///
/// The value is validated against the agent's output schema when one is
/// declared. A value that fails validation produces an error-typed result so
/// the model can correct it and call again; it never aborts the run. Storing
/// a value does not by itself terminate the run.
pub struct SetOutputTool;

impl SetOutputTool {
    /// Create a new set_output tool.
    pub fn new() -> Self {
        Self
    }
}

impl Default for SetOutputTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SetOutputTool {
    fn name(&self) -> &str {
        "set_output"
    }

    fn description(&self) -> &str {
        "Record the run's structured output value. The value must conform to \
         the agent's declared output schema. Calling this again replaces the \
         previously recorded value."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "output": {
                    "description": "The output value, matching the agent's output schema"
                }
            },
            "required": ["output"]
        })
    }

    fn concurrency_safety(&self) -> ConcurrencySafety {
        ConcurrencySafety::Unsafe
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> Result<ToolOutput> {
        let value = input.get("output").cloned().ok_or_else(|| {
            crate::error::tool_error::InvalidInputSnafu {
                message: "output is required",
            }
            .build()
        })?;

        if let Some(schema) = &ctx.output_schema {
            if let ValidationResult::Invalid { errors } = validate_against_schema(&value, schema) {
                let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                return Ok(ToolOutput::error(format!(
                    "Output does not match the declared schema: {}",
                    error_msgs.join(", ")
                )));
            }
        }

        Ok(ToolOutput::text("Structured output recorded")
            .with_modifier(RunModifier::SetOutput { value }))
    }
}

#[cfg(test)]
#[path = "set_output.test.rs"]
mod tests;
