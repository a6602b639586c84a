//! Core chat types shared across chatrelay components

use serde::{Deserialize, Serialize};

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire label for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One part of a chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    /// Plain text authored in the conversation
    Text { text: String },

    /// Text extracted from an uploaded document, with its display name
    Document { name: String, text: String },
}

impl MessagePart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a document part
    pub fn document(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Document {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: Role,

    /// Ordered message parts
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: Role, parts: Vec<MessagePart>) -> Self {
        Self { role, parts }
    }

    /// Create a single-part user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![MessagePart::text(text)])
    }

    /// Create a single-part assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![MessagePart::text(text)])
    }

    /// Create a single-part system message
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![MessagePart::text(text)])
    }

    /// Concatenated text parts, skipping documents
    pub fn plain_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.as_str()),
                MessagePart::Document { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_skips_documents() {
        let message = ChatMessage::new(
            Role::User,
            vec![
                MessagePart::text("hello"),
                MessagePart::document("notes.pdf", "contents"),
                MessagePart::text("world"),
            ],
        );
        assert_eq!(message.plain_text(), "hello\nworld");
    }

    #[test]
    fn test_part_wire_shape() {
        let part = serde_json::to_value(MessagePart::text("hi")).unwrap();
        assert_eq!(part, serde_json::json!({"type": "text", "text": "hi"}));
    }
}
