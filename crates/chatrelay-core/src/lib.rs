//! chatrelay Core
//!
//! Core types and state machines shared across chatrelay components.
//!
//! This crate provides:
//! - The outward stream protocol (start/delta/end/usage/finish/error events)
//! - The per-block delta tracking state machine
//! - Token usage normalization
//! - Error types and result handling

pub mod error;
pub mod event;
pub mod tracker;
pub mod types;
pub mod usage;

pub use error::{Error, Result};
pub use event::{BlockKind, StreamEvent};
pub use tracker::{DeltaTracker, TrackedBlock};
pub use types::{ChatMessage, MessagePart, Role};
pub use usage::{CostSummary, RawUsage, TokenUsage, UsageSummary};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::event::{BlockKind, StreamEvent};
    pub use crate::tracker::DeltaTracker;
    pub use crate::types::{ChatMessage, MessagePart, Role};
    pub use crate::usage::{RawUsage, TokenUsage, UsageSummary};
}
