//! Built-in tool for replacing a run's message history.

use async_trait::async_trait;
use ensemble_protocol::ConcurrencySafety;
use ensemble_protocol::Message;
use ensemble_protocol::RunModifier;
use ensemble_protocol::ToolOutput;
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::Result;
use crate::tool::Tool;

/// Tool for replacing the run's entire message history.
///
/// The provided list becomes the complete history: nothing recorded before
/// the call survives it. Step programs use this to drop early scaffolding
/// once a cleaner canonical history has been derived, which keeps provider
/// prompt caching effective across repeated child runs with shared prefixes.
pub struct SetMessagesTool;

impl SetMessagesTool {
    /// Create a new set_messages tool.
    pub fn new() -> Self {
        Self
    }
}

impl Default for SetMessagesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SetMessagesTool {
    fn name(&self) -> &str {
        "set_messages"
    }

    fn description(&self) -> &str {
        "Replace the run's entire message history with the provided list. \
         The next model call sees only these messages; everything recorded \
         before this call is discarded."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "messages": {
                    "type": "array",
                    "description": "The replacement history, in order",
                    "items": {
                        "type": "object",
                        "properties": {
                            "role": {
                                "type": "string",
                                "enum": ["system", "user", "assistant", "tool"],
                                "description": "Author of the message"
                            },
                            "content": {
                                "type": "array",
                                "description": "Ordered content parts"
                            }
                        },
                        "required": ["role", "content"]
                    }
                }
            },
            "required": ["messages"]
        })
    }

    fn concurrency_safety(&self) -> ConcurrencySafety {
        ConcurrencySafety::Unsafe
    }

    async fn execute(&self, input: Value, _ctx: &mut ToolContext) -> Result<ToolOutput> {
        if !input["messages"].is_array() {
            return Err(crate::error::tool_error::InvalidInputSnafu {
                message: "messages must be an array",
            }
            .build());
        }
        let messages: Vec<Message> = serde_json::from_value(input["messages"].clone())?;

        let count = messages.len();
        Ok(
            ToolOutput::text(format!("Replaced message history ({count} messages)"))
                .with_modifier(RunModifier::ReplaceMessages { messages }),
        )
    }
}

#[cfg(test)]
#[path = "set_messages.test.rs"]
mod tests;
