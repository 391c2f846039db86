//! The per-run message log.

use ensemble_protocol::ContentPart;
use ensemble_protocol::Message;
use ensemble_protocol::Role;
use tracing::debug;

/// An ordered log of the messages in a run.
///
/// Messages are appended as the run progresses; existing entries are never
/// edited in place. `replace_all` swaps the entire log at once, which is how
/// `set_messages` rewrites an agent's context. The system prompt is not
/// stored here; the executor attaches it when building each completion
/// request, so a replacement can never corrupt it.
#[derive(Debug, Clone, Default)]
pub struct MessageHistory {
    messages: Vec<Message>,
}

impl MessageHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history seeded with messages.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Append one message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append several messages in order.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// Replace the entire log.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        debug!(
            old_len = self.messages.len(),
            new_len = messages.len(),
            "replacing message history"
        );
        self.messages = messages;
    }

    /// The messages in append order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Consume the history, returning the messages.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The most recent assistant message, if any.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Text of the most recent assistant message.
    pub fn last_assistant_text(&self) -> Option<String> {
        self.last_assistant().map(Message::text)
    }

    /// IDs of tool uses in the latest assistant message that no later
    /// message has answered.
    pub fn unresolved_tool_call_ids(&self) -> Vec<String> {
        let Some(idx) = self.messages.iter().rposition(|m| m.role == Role::Assistant) else {
            return Vec::new();
        };
        let pending = self.messages[idx].tool_use_ids();
        if pending.is_empty() {
            return Vec::new();
        }
        let answered: Vec<&str> = self.messages[idx + 1..]
            .iter()
            .flat_map(Message::tool_result_ids)
            .collect();
        pending
            .into_iter()
            .filter(|id| !answered.contains(id))
            .map(str::to_string)
            .collect()
    }

    /// A copy of the log suitable for a completion request.
    ///
    /// Wholesale replacement can leave the log incoherent for providers:
    /// empty messages, or tool results whose originating tool use was
    /// removed. Those are dropped here rather than mutated in the log, so
    /// `messages()` still reflects exactly what the agent wrote.
    pub fn for_completion(&self) -> Vec<Message> {
        let mut sanitized: Vec<Message> = Vec::with_capacity(self.messages.len());

        for message in &self.messages {
            let content: Vec<ContentPart> = message
                .content
                .iter()
                .filter(|part| match part {
                    ContentPart::ToolResult { tool_use_id, .. } => {
                        has_matching_tool_use(&sanitized, tool_use_id)
                    }
                    _ => true,
                })
                .cloned()
                .collect();

            if content.is_empty() {
                continue;
            }
            sanitized.push(Message::new(message.role, content));
        }

        sanitized
    }
}

/// Check whether a tool result answers a tool use in the preceding messages.
///
/// Scans backwards and stops at the nearest assistant message: results must
/// directly answer the latest assistant turn, not one further back.
fn has_matching_tool_use(prior: &[Message], tool_use_id: &str) -> bool {
    for message in prior.iter().rev() {
        if message.role == Role::Assistant {
            return message.tool_use_ids().contains(&tool_use_id);
        }
    }
    false
}

#[cfg(test)]
#[path = "history.test.rs"]
mod tests;
