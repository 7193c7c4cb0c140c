//! Conversation messages.

use crate::content::Content;
use crate::tool::ToolCall;
use serde::{Deserialize, Serialize};

// ─────────────────────
// Messages
// ─────────────────────

/// Role of a [`Message`] in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// Input from the user.
    User,
    /// Output from the model.
    Assistant,
    /// The answer to a tool call.
    ToolCall,
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// System instructions. A conversation holds at most one.
    System {
        /// The instructions.
        content: String,
    },
    /// A user turn made of ordered content parts.
    User {
        /// The content parts.
        content: Vec<Content>,
    },
    /// A model turn: text, tool calls, or both.
    Assistant {
        /// Generated text, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        /// Tool calls requested in this turn.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// The answer to a tool call requested by the model.
    ToolCall {
        /// The call being answered.
        tool_call: ToolCall,
        /// The tool's output.
        content: String,
    },
}

impl Message {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Creates a user message with a single text part.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            content: vec![Content::text(text)],
        }
    }

    /// Creates a user message from content parts.
    #[must_use]
    pub fn user_with(content: impl IntoIterator<Item = Content>) -> Self {
        Self::User {
            content: content.into_iter().collect(),
        }
    }

    /// Creates an assistant message with text content.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Creates an assistant message requesting tool calls.
    #[must_use]
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: None,
            tool_calls,
        }
    }

    /// Creates the answer to a tool call.
    #[must_use]
    pub fn tool_call(tool_call: ToolCall, content: impl Into<String>) -> Self {
        Self::ToolCall {
            tool_call,
            content: content.into(),
        }
    }

    /// Returns the role of this message.
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::ToolCall { .. } => Role::ToolCall,
        }
    }

    /// Returns the text carried by this message.
    ///
    /// For user messages the text parts are joined with a single space and
    /// non-text parts are skipped.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match self {
            Self::System { content } | Self::ToolCall { content, .. } => Some(content.clone()),
            Self::User { content } => {
                let parts: Vec<&str> = content.iter().filter_map(Content::as_text).collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            }
            Self::Assistant { content, .. } => content.clone(),
        }
    }

    /// Returns whether any content part is an image.
    #[must_use]
    pub fn has_image(&self) -> bool {
        match self {
            Self::User { content } => content
                .iter()
                .any(|part| matches!(part, Content::Image { .. } | Content::ImageUrl { .. })),
            _ => false,
        }
    }
}

// ─────────────────────
// Message bag
// ─────────────────────

/// An ordered conversation.
///
/// The bag does not validate turn order; producers are expected to keep at most
/// one system message and to place a user message before the turn answering it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBag {
    messages: Vec<Message>,
}

impl MessageBag {
    /// Creates an empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message, builder-style.
    #[must_use]
    pub fn with(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Inserts a message at the start of the conversation.
    pub fn prepend(&mut self, message: Message) {
        self.messages.insert(0, message);
    }

    /// Returns the messages in order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Iterates over the messages in order.
    pub fn iter(&self) -> core::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns whether the conversation is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the system message, if present.
    #[must_use]
    pub fn system_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .find(|message| message.role() == Role::System)
    }

    /// Returns the most recent user message, if present.
    #[must_use]
    pub fn user_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role() == Role::User)
    }

    /// Returns a copy of the conversation without its system message.
    #[must_use]
    pub fn without_system_message(&self) -> Self {
        self.messages
            .iter()
            .filter(|message| message.role() != Role::System)
            .cloned()
            .collect()
    }

    /// Returns whether any message carries an image.
    #[must_use]
    pub fn contains_image(&self) -> bool {
        self.messages.iter().any(Message::has_image)
    }
}

impl From<Vec<Message>> for MessageBag {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl FromIterator<Message> for MessageBag {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MessageBag {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a MessageBag {
    type Item = &'a Message;
    type IntoIter = core::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_returns_latest_user_turn() {
        let bag = MessageBag::new()
            .with(Message::system("be brief"))
            .with(Message::user("first"))
            .with(Message::assistant("ok"))
            .with(Message::user("second"));

        assert_eq!(bag.user_message().and_then(Message::text).as_deref(), Some("second"));
    }

    #[test]
    fn user_text_skips_non_text_parts() {
        let message = Message::user_with([
            Content::text("describe"),
            Content::image_url("https://example.com/cat.png"),
            Content::text("this"),
        ]);

        assert_eq!(message.text().as_deref(), Some("describe this"));
        assert!(message.has_image());
    }

    #[test]
    fn without_system_message_keeps_the_rest() {
        let bag = MessageBag::new()
            .with(Message::system("rules"))
            .with(Message::user("hi"));

        let stripped = bag.without_system_message();
        assert_eq!(stripped.len(), 1);
        assert!(stripped.system_message().is_none());
    }

    #[test]
    fn messages_serialize_with_role_tag() {
        let value = serde_json::to_value(Message::assistant("done")).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"], "done");
    }
}
