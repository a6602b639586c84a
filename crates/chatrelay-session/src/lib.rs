//! chatrelay Session
//!
//! Everything that happens between an accepted chat request and a closed
//! turn: the orchestrator that drives one assistant turn, resumable
//! stream delivery, chat persistence, rate limiting, and title
//! derivation.

pub mod orchestrator;
pub mod rate_limit;
pub mod resumable;
pub mod store;
pub mod title;

pub use orchestrator::{BlockText, EventSink, TurnOrchestrator, TurnSummary};
pub use rate_limit::{RateDecision, RateLimiter, UserType};
pub use resumable::{channel_sink, ChannelSink, StreamPublisher, StreamRegistry};
pub use store::{ChatRecord, ChatStore, MemoryStore, MessageRecord, StreamIdRecord, Visibility};
pub use title::derive_title;
