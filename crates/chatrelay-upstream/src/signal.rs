//! Upstream signal model
//!
//! The provider's named streaming events are decoded at the wire boundary
//! into this closed union, so the orchestrator is pure dispatch over a
//! finite set of inputs.

use chatrelay_core::RawUsage;

/// Final payload of a completed upstream response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalResponse {
    /// Model that served the turn, when reported
    pub model: Option<String>,

    /// Raw token accounting, when reported
    pub usage: Option<RawUsage>,
}

/// One decoded upstream lifecycle signal
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    /// Incremental visible output text for a block
    OutputTextDelta { id: String, delta: String },

    /// A visible output block completed
    OutputTextDone { id: String },

    /// Incremental reasoning text for a block
    ReasoningTextDelta { id: String, delta: String },

    /// A reasoning block completed
    ReasoningTextDone { id: String },

    /// The run completed normally
    Completed(FinalResponse),

    /// The run failed, was cancelled, or expired
    Failed { message: Option<String> },

    /// Signal kind the relay does not act on (forward compatibility)
    Ignored,
}

impl UpstreamEvent {
    /// Check if this signal terminates the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed { .. })
    }
}
