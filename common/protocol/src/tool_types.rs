//! Tool-related types for the agent runtime.
//!
//! These types describe what a tool looks like to the model, how the model
//! asks for it, and what comes back from an execution.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::message::Message;

/// Concurrency safety level for a tool.
///
/// Safe tools may run in parallel with other calls from the same assistant
/// turn. Unsafe tools only start after every earlier call in the turn has
/// finished, and run alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencySafety {
    /// Tool is safe to run concurrently with other tools.
    #[default]
    Safe,
    /// Tool must wait for prior calls and run exclusively.
    Unsafe,
}

impl ConcurrencySafety {
    /// Check if concurrent execution is safe.
    pub fn is_safe(&self) -> bool {
        matches!(self, ConcurrencySafety::Safe)
    }

    /// Get the safety level as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcurrencySafety::Safe => "safe",
            ConcurrencySafety::Unsafe => "unsafe",
        }
    }
}

impl std::fmt::Display for ConcurrencySafety {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tool definition advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name, unique within a run.
    pub name: String,
    /// Human-readable description shown to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema for the tool's input.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a definition with no description.
    pub fn new(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
        }
    }

    /// Create a definition with a description.
    pub fn full(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            parameters,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier, echoed back in the matching result.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Invocation arguments as a JSON object.
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Deserialize the arguments into a typed value.
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.arguments.clone())
    }
}

/// Content of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    /// Text content.
    Text(String),
    /// Structured content (JSON).
    Structured(Value),
}

impl Default for ToolResultContent {
    fn default() -> Self {
        ToolResultContent::Text(String::new())
    }
}

impl ToolResultContent {
    /// Render the content as text for contexts that only take strings.
    pub fn to_text(&self) -> String {
        match self {
            ToolResultContent::Text(s) => s.clone(),
            ToolResultContent::Structured(v) => v.to_string(),
        }
    }
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The content of the output.
    pub content: ToolResultContent,
    /// Whether this output represents an error.
    #[serde(default)]
    pub is_error: bool,
    /// Run modifiers to apply after this tool execution.
    #[serde(default)]
    pub modifiers: Vec<RunModifier>,
}

impl Default for ToolOutput {
    fn default() -> Self {
        Self {
            content: ToolResultContent::default(),
            is_error: false,
            modifiers: Vec::new(),
        }
    }
}

impl ToolOutput {
    /// Create a successful text output.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: ToolResultContent::Text(content.into()),
            is_error: false,
            modifiers: Vec::new(),
        }
    }

    /// Create an error output.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: ToolResultContent::Text(message.into()),
            is_error: true,
            modifiers: Vec::new(),
        }
    }

    /// Create a structured output.
    pub fn structured(value: Value) -> Self {
        Self {
            content: ToolResultContent::Structured(value),
            is_error: false,
            modifiers: Vec::new(),
        }
    }

    /// Add a run modifier.
    pub fn with_modifier(mut self, modifier: RunModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Truncate text content, keeping at most `max_chars` bytes of the
    /// original split between its start and end, with a marker noting how
    /// much was omitted. Structured content is left alone.
    pub fn truncate_to(&mut self, max_chars: usize) {
        if let ToolResultContent::Text(ref text) = self.content {
            if text.len() > max_chars {
                let half = max_chars / 2;
                let mut start_end = half.min(text.len());
                while !text.is_char_boundary(start_end) {
                    start_end -= 1;
                }
                let mut suffix_start = text.len() - half.min(text.len());
                while !text.is_char_boundary(suffix_start) {
                    suffix_start += 1;
                }
                let start = &text[..start_end];
                let end = &text[suffix_start..];
                let omitted = suffix_start - start_end;
                self.content = ToolResultContent::Text(format!(
                    "{start}\n\n... (output truncated, {omitted} characters omitted) ...\n\n{end}"
                ));
            }
        }
    }
}

/// A modifier that changes the parent run's state after tool execution.
///
/// Built-in tools return these instead of mutating run state directly. The
/// step executor applies them once the whole tool batch has finished, which
/// keeps tool handlers free of references into the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunModifier {
    /// Record the run's structured output value.
    SetOutput {
        /// The value, already validated against the agent's output schema.
        value: Value,
    },
    /// Replace the run's entire message history.
    ReplaceMessages {
        /// The new history, in order.
        messages: Vec<Message>,
    },
}

/// Result of validating input against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ValidationResult {
    /// Input is valid.
    Valid,
    /// Input is invalid.
    Invalid {
        /// List of validation errors.
        errors: Vec<ValidationError>,
    },
}

impl ValidationResult {
    /// Check if validation passed.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Create a valid result.
    pub fn valid() -> Self {
        ValidationResult::Valid
    }

    /// Create an invalid result with errors.
    pub fn invalid(errors: impl IntoIterator<Item = ValidationError>) -> Self {
        ValidationResult::Invalid {
            errors: errors.into_iter().collect(),
        }
    }

    /// Create an invalid result with a single error.
    pub fn error(message: impl Into<String>) -> Self {
        ValidationResult::Invalid {
            errors: vec![ValidationError {
                message: message.into(),
                path: None,
            }],
        }
    }

    /// Join all error messages into one line.
    pub fn error_summary(&self) -> Option<String> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid { errors } => Some(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        }
    }
}

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error message.
    pub message: String,
    /// JSON path to the invalid field (if applicable).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    /// Create a validation error with a path.
    pub fn with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {}", path, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

#[cfg(test)]
#[path = "tool_types.test.rs"]
mod tests;
