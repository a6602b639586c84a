//! Message rate limiting
//!
//! Counts a user's recent messages against their entitlement before a
//! turn is opened. The window slides over the persisted message log, so
//! limits survive restarts with any durable store.

use crate::store::ChatStore;
use chatrelay_core::{Result, Role};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Account tier of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Guest,
    Regular,
}

impl UserType {
    /// Daily message allowance for this tier
    pub fn max_messages_per_day(&self) -> usize {
        match self {
            Self::Guest => 20,
            Self::Regular => 100,
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub recent_messages: usize,
    pub limit: usize,
}

/// Sliding-window rate limiter over the message log
pub struct RateLimiter {
    store: Arc<dyn ChatStore>,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter with the default 24 hour window
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self::with_window(store, Duration::hours(24))
    }

    /// Create a limiter with a custom window
    pub fn with_window(store: Arc<dyn ChatStore>, window: Duration) -> Self {
        Self { store, window }
    }

    /// Check whether the user may send another message.
    ///
    /// A user exactly at the limit still passes; only exceeding it
    /// rejects.
    pub async fn check(&self, user_id: &str, user_type: UserType) -> Result<RateDecision> {
        let since = Utc::now() - self.window;
        let recent_messages = self
            .store
            .message_count_since(user_id, since, Role::User)
            .await?;
        let limit = user_type.max_messages_per_day();

        Ok(RateDecision {
            allowed: recent_messages <= limit,
            recent_messages,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChatRecord, MemoryStore, MessageRecord, Visibility};
    use chatrelay_core::MessagePart;

    async fn store_with_messages(count: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .save_chat(ChatRecord {
                id: "c1".into(),
                user_id: "u1".into(),
                title: "t".into(),
                visibility: Visibility::Private,
                created_at: Utc::now(),
                last_usage: None,
            })
            .await
            .unwrap();

        let messages = (0..count)
            .map(|i| MessageRecord {
                id: format!("m{i}"),
                chat_id: "c1".into(),
                role: Role::User,
                parts: vec![MessagePart::text("hi")],
                created_at: Utc::now(),
            })
            .collect();
        store.save_messages(messages).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_under_limit_allowed() {
        let store = store_with_messages(3).await;
        let decision = RateLimiter::new(store)
            .check("u1", UserType::Guest)
            .await
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.recent_messages, 3);
    }

    #[tokio::test]
    async fn test_at_limit_still_allowed() {
        let store = store_with_messages(UserType::Guest.max_messages_per_day()).await;
        let decision = RateLimiter::new(store)
            .check("u1", UserType::Guest)
            .await
            .unwrap();
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn test_over_limit_rejected() {
        let store = store_with_messages(UserType::Guest.max_messages_per_day() + 1).await;
        let decision = RateLimiter::new(store)
            .check("u1", UserType::Guest)
            .await
            .unwrap();
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn test_regular_tier_has_higher_allowance() {
        let store = store_with_messages(UserType::Guest.max_messages_per_day() + 1).await;
        let decision = RateLimiter::new(store)
            .check("u1", UserType::Regular)
            .await
            .unwrap();
        assert!(decision.allowed);
    }
}
