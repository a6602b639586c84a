//! Outward stream protocol
//!
//! One assistant turn is delivered to clients as an ordered sequence of
//! these events, serialized as one JSON object per server-sent-event frame.

use crate::usage::UsageSummary;
use serde::{Deserialize, Serialize};

/// Content kind of a streamed block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Visible assistant output text
    Text,
    /// Model reasoning text
    Reasoning,
}

impl BlockKind {
    /// Stable prefix used when synthesizing block ids from ordinal indexes
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Reasoning => "reasoning",
        }
    }

    /// Build the start event for a block of this kind
    pub fn start_event(&self, id: impl Into<String>) -> StreamEvent {
        match self {
            Self::Text => StreamEvent::TextStart { id: id.into() },
            Self::Reasoning => StreamEvent::ReasoningStart { id: id.into() },
        }
    }

    /// Build the delta event for a block of this kind
    pub fn delta_event(&self, id: impl Into<String>, delta: impl Into<String>) -> StreamEvent {
        match self {
            Self::Text => StreamEvent::TextDelta {
                id: id.into(),
                delta: delta.into(),
            },
            Self::Reasoning => StreamEvent::ReasoningDelta {
                id: id.into(),
                delta: delta.into(),
            },
        }
    }

    /// Build the end event for a block of this kind
    pub fn end_event(&self, id: impl Into<String>) -> StreamEvent {
        match self {
            Self::Text => StreamEvent::TextEnd { id: id.into() },
            Self::Reasoning => StreamEvent::ReasoningEnd { id: id.into() },
        }
    }
}

/// One event in the outward protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// Turn opened
    #[serde(rename = "start")]
    Start,

    /// A text block began
    #[serde(rename = "text-start")]
    TextStart { id: String },

    /// Incremental text for an open block
    #[serde(rename = "text-delta")]
    TextDelta { id: String, delta: String },

    /// A text block finished
    #[serde(rename = "text-end")]
    TextEnd { id: String },

    /// A reasoning block began
    #[serde(rename = "reasoning-start")]
    ReasoningStart { id: String },

    /// Incremental reasoning text for an open block
    #[serde(rename = "reasoning-delta")]
    ReasoningDelta { id: String, delta: String },

    /// A reasoning block finished
    #[serde(rename = "reasoning-end")]
    ReasoningEnd { id: String },

    /// Token/cost accounting for the turn
    #[serde(rename = "data-usage")]
    Usage { data: UsageSummary },

    /// Turn completed normally
    #[serde(rename = "finish")]
    Finish,

    /// Turn terminated with a stream-level failure
    #[serde(rename = "error")]
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },
}

impl StreamEvent {
    /// Check if this event terminates the turn
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish | Self::Error { .. })
    }

    /// Serialize as one server-sent-event frame (`data: {json}\n\n`)
    pub fn to_sse_frame(&self) -> String {
        // StreamEvent has no map keys that can fail to serialize
        let json = serde_json::to_string(self).expect("stream event serializes");
        format!("data: {json}\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let start = serde_json::to_value(&StreamEvent::Start).unwrap();
        assert_eq!(start, serde_json::json!({"type": "start"}));

        let delta = serde_json::to_value(&StreamEvent::TextDelta {
            id: "m1".into(),
            delta: "Hel".into(),
        })
        .unwrap();
        assert_eq!(
            delta,
            serde_json::json!({"type": "text-delta", "id": "m1", "delta": "Hel"})
        );

        let error = serde_json::to_value(&StreamEvent::Error {
            error_text: "boom".into(),
        })
        .unwrap();
        assert_eq!(
            error,
            serde_json::json!({"type": "error", "errorText": "boom"})
        );
    }

    #[test]
    fn test_kind_events() {
        assert_eq!(
            BlockKind::Reasoning.start_event("r1"),
            StreamEvent::ReasoningStart { id: "r1".into() }
        );
        assert_eq!(
            BlockKind::Text.end_event("m1"),
            StreamEvent::TextEnd { id: "m1".into() }
        );
    }

    #[test]
    fn test_sse_frame() {
        let frame = StreamEvent::Finish.to_sse_frame();
        assert_eq!(frame, "data: {\"type\":\"finish\"}\n\n");
    }

    #[test]
    fn test_terminal_events() {
        assert!(StreamEvent::Finish.is_terminal());
        assert!(StreamEvent::Error {
            error_text: "x".into()
        }
        .is_terminal());
        assert!(!StreamEvent::Start.is_terminal());
    }
}
