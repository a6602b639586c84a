//! Request assembly
//!
//! Builds the provider request body for one assistant turn from the chat
//! history. Document parts are folded into the authoring message's text
//! under an attachment heading; messages with no usable text are dropped.

use chatrelay_core::{ChatMessage, MessagePart};
use serde::Serialize;

/// Provider request body for one streamed turn
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRequest {
    pub model: String,

    pub input: Vec<InputItem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    pub stream: bool,
}

impl ResponseRequest {
    /// Build a streaming request from chat history
    pub fn streaming(model: impl Into<String>, input: Vec<InputItem>) -> Self {
        Self {
            model: model.into(),
            input,
            temperature: None,
            max_output_tokens: None,
            stream: true,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the generated output length
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// One role-tagged item of provider input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputItem {
    pub role: String,
    pub content: Vec<InputContent>,
}

/// Typed content inside an input item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum InputContent {
    #[serde(rename = "input_text")]
    InputText { text: String },
}

/// Convert chat history into provider input items.
///
/// The system prompt, when non-empty, leads. Per message: text parts are
/// joined with newlines; document parts are appended under an
/// "[Attached documents]" heading; a message that ends up empty is dropped.
pub fn build_input(system_prompt: Option<&str>, messages: &[ChatMessage]) -> Vec<InputItem> {
    let mut items = Vec::with_capacity(messages.len() + 1);

    if let Some(system) = system_prompt {
        if !system.trim().is_empty() {
            items.push(InputItem {
                role: "system".to_string(),
                content: vec![InputContent::InputText {
                    text: system.to_string(),
                }],
            });
        }
    }

    for message in messages {
        if let Some(text) = assemble_message_text(message) {
            items.push(InputItem {
                role: message.role.as_str().to_string(),
                content: vec![InputContent::InputText { text }],
            });
        }
    }

    items
}

fn assemble_message_text(message: &ChatMessage) -> Option<String> {
    let mut base = message
        .parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::Text { text } => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            MessagePart::Document { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    let docs = message
        .parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::Document { text, .. } => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            MessagePart::Text { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    if !docs.is_empty() {
        if base.is_empty() {
            base = format!("[Attached documents]\n{docs}");
        } else {
            base = format!("{base}\n\n[Attached documents]\n{docs}");
        }
    }

    (!base.is_empty()).then_some(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_core::Role;

    #[test]
    fn test_system_prompt_leads() {
        let items = build_input(Some("be brief"), &[ChatMessage::user("hi")]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].role, "system");
        assert_eq!(
            items[0].content,
            vec![InputContent::InputText {
                text: "be brief".into()
            }]
        );
        assert_eq!(items[1].role, "user");
    }

    #[test]
    fn test_empty_messages_dropped() {
        let empty = ChatMessage::new(Role::User, vec![MessagePart::text("   ")]);
        let items = build_input(None, &[empty, ChatMessage::assistant("reply")]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].role, "assistant");
    }

    #[test]
    fn test_documents_folded_under_heading() {
        let message = ChatMessage::new(
            Role::User,
            vec![
                MessagePart::text("summarize this"),
                MessagePart::document("notes.pdf", "quarterly numbers"),
            ],
        );
        let items = build_input(None, &[message]);
        assert_eq!(
            items[0].content,
            vec![InputContent::InputText {
                text: "summarize this\n\n[Attached documents]\nquarterly numbers".into()
            }]
        );
    }

    #[test]
    fn test_document_only_message() {
        let message = ChatMessage::new(
            Role::User,
            vec![MessagePart::document("a.txt", "alpha")],
        );
        let items = build_input(None, &[message]);
        assert_eq!(
            items[0].content,
            vec![InputContent::InputText {
                text: "[Attached documents]\nalpha".into()
            }]
        );
    }

    #[test]
    fn test_request_wire_shape() {
        let request = ResponseRequest::streaming(
            "gpt-4o-mini",
            build_input(None, &[ChatMessage::user("hi")]),
        )
        .with_temperature(0.5);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "input": [
                    {"role": "user", "content": [{"type": "input_text", "text": "hi"}]}
                ],
                "temperature": 0.5,
                "stream": true,
            })
        );
    }
}
