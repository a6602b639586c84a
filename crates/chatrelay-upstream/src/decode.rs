//! Responses SSE decoder
//!
//! Parses the provider's streaming format, one JSON payload per SSE frame:
//! ```text
//! data: {"type":"response.output_text.delta","item_id":"msg_1","output_index":0,"delta":"Hel"}
//!
//! data: {"type":"response.completed","response":{"model":"gpt-4o-mini","usage":{"input_tokens":10,"output_tokens":5,"total_tokens":15}}}
//! ```

use crate::signal::{FinalResponse, UpstreamEvent};
use chatrelay_core::{BlockKind, Error, RawUsage, Result};
use serde::Deserialize;

/// Decoder for the Responses streaming wire format
#[derive(Debug, Clone, Default)]
pub struct ResponsesDecoder;

impl ResponsesDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self
    }

    /// Decode one SSE data payload into a signal.
    ///
    /// Unknown event kinds decode to [`UpstreamEvent::Ignored`]; malformed
    /// JSON is a decode error.
    pub fn decode_data(&self, payload: &str) -> Result<UpstreamEvent> {
        let event: WireEvent = serde_json::from_str(payload)
            .map_err(|e| Error::decode(format!("bad upstream frame: {e}")))?;

        Ok(match event.kind.as_str() {
            "response.output_text.delta" => UpstreamEvent::OutputTextDelta {
                id: event.block_id(BlockKind::Text),
                delta: event.delta.unwrap_or_default(),
            },
            "response.output_text.done" => UpstreamEvent::OutputTextDone {
                id: event.block_id(BlockKind::Text),
            },
            "response.reasoning_text.delta" => UpstreamEvent::ReasoningTextDelta {
                id: event.block_id(BlockKind::Reasoning),
                delta: event.delta.unwrap_or_default(),
            },
            "response.reasoning_text.done" => UpstreamEvent::ReasoningTextDone {
                id: event.block_id(BlockKind::Reasoning),
            },
            "response.completed" => {
                let response = event.response.unwrap_or_default();
                UpstreamEvent::Completed(FinalResponse {
                    model: response.model,
                    usage: response.usage,
                })
            }
            "response.failed" | "response.cancelled" | "response.incomplete" | "error" => {
                UpstreamEvent::Failed {
                    message: event.failure_message(),
                }
            }
            _ => UpstreamEvent::Ignored,
        })
    }

    /// Check if this payload is the end-of-stream marker
    pub fn is_done_marker(&self, payload: &str) -> bool {
        payload.trim() == "[DONE]"
    }
}

// =============================================================================
// Wire structures
// =============================================================================

#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,

    item_id: Option<String>,

    #[serde(default)]
    output_index: u64,

    delta: Option<String>,

    response: Option<WireResponse>,

    /// Top-level error body (`error` events)
    error: Option<WireError>,

    /// Bare message, used by some failure shapes
    message: Option<String>,
}

impl WireEvent {
    /// Block id: upstream item id, or synthesized from the ordinal index
    fn block_id(&self, kind: BlockKind) -> String {
        match &self.item_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}-{}", kind.id_prefix(), self.output_index),
        }
    }

    fn failure_message(&self) -> Option<String> {
        self.response
            .as_ref()
            .and_then(|response| response.error.as_ref())
            .and_then(|error| error.message.clone())
            .or_else(|| {
                self.error
                    .as_ref()
                    .and_then(|error| error.message.clone())
            })
            .or_else(|| self.message.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
struct WireResponse {
    model: Option<String>,
    usage: Option<RawUsage>,
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: Option<String>,
}
