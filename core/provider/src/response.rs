//! Response types from model completions.

use ensemble_protocol::ContentPart;
use ensemble_protocol::Message;
use ensemble_protocol::Role;
use ensemble_protocol::TokenUsage;
use ensemble_protocol::ToolCall;
use serde::Deserialize;
use serde::Serialize;

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation.
    #[default]
    Stop,
    /// Hit max tokens limit.
    MaxTokens,
    /// Model wants to use a tool.
    ToolCalls,
    /// Unknown or other reason.
    Other,
}

/// Response from a model completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Content parts in the response.
    pub content: Vec<ContentPart>,
    /// Reason generation stopped.
    pub finish_reason: FinishReason,
    /// Token usage statistics.
    #[serde(default)]
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
}

impl CompletionResponse {
    /// Create an empty response from the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            content: vec![],
            finish_reason: FinishReason::Stop,
            usage: TokenUsage::default(),
            model: model.into(),
        }
    }

    /// Set the content parts.
    pub fn with_content(mut self, content: Vec<ContentPart>) -> Self {
        self.content = content;
        self
    }

    /// Set the finish reason.
    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = reason;
        self
    }

    /// Set token usage.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Get all text content concatenated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|p| p.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Get all tool calls from the response, in content order.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|p| match p {
                ContentPart::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Check if the response contains tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.content.iter().any(ContentPart::is_tool_use)
    }

    /// Convert the response content into an assistant message.
    pub fn assistant_message(&self) -> Message {
        Message::new(Role::Assistant, self.content.clone())
    }
}

#[cfg(test)]
#[path = "response.test.rs"]
mod tests;
