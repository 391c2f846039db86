//! Conversation message types.
//!
//! A run's history is an ordered list of [`Message`]s. Each message has a
//! [`Role`] and a list of [`ContentPart`]s, so a single assistant message can
//! carry text alongside tool invocations, and a single tool message can carry
//! several results.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::tool_types::ToolResultContent;

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// Caller or end-user input.
    User,
    /// Model output.
    Assistant,
    /// Tool results fed back to the model.
    Tool,
}

/// A single piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// A tool invocation requested by the model.
    ToolUse {
        /// Unique identifier for this invocation, echoed back in the result.
        id: String,
        /// Name of the tool to invoke.
        name: String,
        /// Invocation arguments as a JSON object.
        input: Value,
    },
    /// The result of a tool invocation.
    ToolResult {
        /// Identifier of the `ToolUse` this result answers.
        tool_use_id: String,
        /// Result content.
        content: ToolResultContent,
        /// Whether the invocation failed.
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentPart {
    /// Create a text part.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ensemble_protocol::ContentPart;
    ///
    /// let part = ContentPart::text("hello");
    /// assert_eq!(part.as_text(), Some("hello"));
    /// ```
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Create a tool use part.
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        ContentPart::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Create a successful tool result part.
    pub fn tool_result(tool_use_id: impl Into<String>, content: ToolResultContent) -> Self {
        ContentPart::ToolResult {
            tool_use_id: tool_use_id.into(),
            content,
            is_error: false,
        }
    }

    /// Create an error tool result part.
    pub fn tool_error(tool_use_id: impl Into<String>, message: impl Into<String>) -> Self {
        ContentPart::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: ToolResultContent::Text(message.into()),
            is_error: true,
        }
    }

    /// Get the text if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Check if this is a tool use part.
    pub fn is_tool_use(&self) -> bool {
        matches!(self, ContentPart::ToolUse { .. })
    }

    /// Check if this is a tool result part.
    pub fn is_tool_result(&self) -> bool {
        matches!(self, ContentPart::ToolResult { .. })
    }
}

/// A message in a run's conversation history.
///
/// # Example
///
/// ```rust
/// use ensemble_protocol::{Message, Role};
///
/// let msg = Message::user("Summarize the release notes");
/// assert_eq!(msg.role, Role::User);
/// assert_eq!(msg.text(), "Summarize the release notes");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message.
    pub role: Role,
    /// Ordered content parts.
    pub content: Vec<ContentPart>,
}

impl Message {
    /// Create a message with an explicit role and parts.
    pub fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self { role, content }
    }

    /// Create a user message with text content.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::text(text)],
        }
    }

    /// Create an assistant message with text content.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentPart::text(text)],
        }
    }

    /// Create a system message with text content.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentPart::text(text)],
        }
    }

    /// Create a tool message carrying a single successful result.
    pub fn tool_result(tool_use_id: impl Into<String>, content: ToolResultContent) -> Self {
        Self {
            role: Role::Tool,
            content: vec![ContentPart::tool_result(tool_use_id, content)],
        }
    }

    /// Create a tool message carrying a single error result.
    pub fn tool_error(tool_use_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: vec![ContentPart::tool_error(tool_use_id, message)],
        }
    }

    /// Concatenate all text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Get all tool use parts.
    pub fn tool_uses(&self) -> Vec<&ContentPart> {
        self.content.iter().filter(|p| p.is_tool_use()).collect()
    }

    /// Check if any part is a tool use.
    pub fn has_tool_use(&self) -> bool {
        self.content.iter().any(ContentPart::is_tool_use)
    }

    /// IDs of every `ToolUse` part in this message.
    pub fn tool_use_ids(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|p| match p {
                ContentPart::ToolUse { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// IDs answered by `ToolResult` parts in this message.
    pub fn tool_result_ids(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|p| match p {
                ContentPart::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "message.test.rs"]
mod tests;
