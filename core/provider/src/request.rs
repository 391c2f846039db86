//! Request types for model completions.

use ensemble_protocol::Message;
use ensemble_protocol::ToolDefinition;
use serde::Deserialize;
use serde::Serialize;

/// Request for a model completion.
///
/// Carries the conversation so far, the system prompt (kept out of the
/// message history and attached here on every call), and the schemas of
/// the tools the calling agent has declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier to complete with.
    pub model: String,
    /// System prompt, if the agent has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Messages in the conversation.
    pub messages: Vec<Message>,
    /// Tools available to the model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i32>,
}

impl CompletionRequest {
    /// Create a new request for the given model.
    ///
    /// # Example
    ///
    /// ```
    /// use ensemble_protocol::Message;
    /// use ensemble_provider::CompletionRequest;
    ///
    /// let request = CompletionRequest::new("claude-sonnet-4-5")
    ///     .with_messages(vec![Message::user("Hello!")]);
    /// assert_eq!(request.messages.len(), 1);
    /// ```
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            messages: vec![],
            tools: vec![],
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the conversation messages.
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Set the available tools.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, t: f64) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, n: i32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Add a message to the request.
    pub fn add_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Check if tools are configured.
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

#[cfg(test)]
#[path = "request.test.rs"]
mod tests;
