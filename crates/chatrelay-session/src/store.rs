//! Chat persistence
//!
//! Storage is behind a trait so the relay can run against any backing
//! store; the in-memory implementation backs tests and single-node
//! deployments.

use async_trait::async_trait;
use chatrelay_core::{MessagePart, Result, Role, UsageSummary};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Who can see a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
}

/// One stored chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,

    /// Usage of the most recent assistant turn, for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_usage: Option<UsageSummary>,
}

/// One stored message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub chat_id: String,
    pub role: Role,
    pub parts: Vec<MessagePart>,
    pub created_at: DateTime<Utc>,
}

/// One stream id minted for a chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamIdRecord {
    pub stream_id: String,
    pub chat_id: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence operations the relay needs
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Insert or replace a chat
    async fn save_chat(&self, chat: ChatRecord) -> Result<()>;

    /// Fetch a chat by id
    async fn get_chat(&self, id: &str) -> Result<Option<ChatRecord>>;

    /// Delete a chat with its messages and stream ids; returns the chat
    async fn delete_chat(&self, id: &str) -> Result<Option<ChatRecord>>;

    /// Record the usage of the chat's most recent turn
    async fn update_chat_last_usage(&self, chat_id: &str, usage: UsageSummary) -> Result<()>;

    /// Append messages
    async fn save_messages(&self, messages: Vec<MessageRecord>) -> Result<()>;

    /// Messages of a chat in insertion order
    async fn messages_for_chat(&self, chat_id: &str) -> Result<Vec<MessageRecord>>;

    /// Mint a stream id for a chat
    async fn create_stream_id(&self, stream_id: &str, chat_id: &str) -> Result<()>;

    /// Most recently minted stream id for a chat
    async fn latest_stream_id(&self, chat_id: &str) -> Result<Option<String>>;

    /// Count a user's messages with the given role since the cutoff
    async fn message_count_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        role: Role,
    ) -> Result<usize>;
}

#[derive(Default)]
struct MemoryInner {
    chats: HashMap<String, ChatRecord>,
    messages: Vec<MessageRecord>,
    stream_ids: Vec<StreamIdRecord>,
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn save_chat(&self, chat: ChatRecord) -> Result<()> {
        self.inner.write().chats.insert(chat.id.clone(), chat);
        Ok(())
    }

    async fn get_chat(&self, id: &str) -> Result<Option<ChatRecord>> {
        Ok(self.inner.read().chats.get(id).cloned())
    }

    async fn delete_chat(&self, id: &str) -> Result<Option<ChatRecord>> {
        let mut inner = self.inner.write();
        let chat = inner.chats.remove(id);
        if chat.is_some() {
            inner.messages.retain(|message| message.chat_id != id);
            inner.stream_ids.retain(|record| record.chat_id != id);
        }
        Ok(chat)
    }

    async fn update_chat_last_usage(&self, chat_id: &str, usage: UsageSummary) -> Result<()> {
        let mut inner = self.inner.write();
        match inner.chats.get_mut(chat_id) {
            Some(chat) => {
                chat.last_usage = Some(usage);
                Ok(())
            }
            None => Err(chatrelay_core::Error::store(format!(
                "chat not found: {chat_id}"
            ))),
        }
    }

    async fn save_messages(&self, messages: Vec<MessageRecord>) -> Result<()> {
        self.inner.write().messages.extend(messages);
        Ok(())
    }

    async fn messages_for_chat(&self, chat_id: &str) -> Result<Vec<MessageRecord>> {
        Ok(self
            .inner
            .read()
            .messages
            .iter()
            .filter(|message| message.chat_id == chat_id)
            .cloned()
            .collect())
    }

    async fn create_stream_id(&self, stream_id: &str, chat_id: &str) -> Result<()> {
        self.inner.write().stream_ids.push(StreamIdRecord {
            stream_id: stream_id.to_string(),
            chat_id: chat_id.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn latest_stream_id(&self, chat_id: &str) -> Result<Option<String>> {
        Ok(self
            .inner
            .read()
            .stream_ids
            .iter()
            .rev()
            .find(|record| record.chat_id == chat_id)
            .map(|record| record.stream_id.clone()))
    }

    async fn message_count_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        role: Role,
    ) -> Result<usize> {
        let inner = self.inner.read();
        let count = inner
            .messages
            .iter()
            .filter(|message| {
                message.role == role
                    && message.created_at >= since
                    && inner
                        .chats
                        .get(&message.chat_id)
                        .is_some_and(|chat| chat.user_id == user_id)
            })
            .count();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(id: &str, user_id: &str) -> ChatRecord {
        ChatRecord {
            id: id.into(),
            user_id: user_id.into(),
            title: "test chat".into(),
            visibility: Visibility::Private,
            created_at: Utc::now(),
            last_usage: None,
        }
    }

    fn message(id: &str, chat_id: &str, role: Role) -> MessageRecord {
        MessageRecord {
            id: id.into(),
            chat_id: chat_id.into(),
            role,
            parts: vec![MessagePart::text("hi")],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_and_get_chat() {
        let store = MemoryStore::new();
        store.save_chat(chat("c1", "u1")).await.unwrap();

        let loaded = store.get_chat("c1").await.unwrap().unwrap();
        assert_eq!(loaded.user_id, "u1");
        assert!(store.get_chat("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = MemoryStore::new();
        store.save_chat(chat("c1", "u1")).await.unwrap();
        store
            .save_messages(vec![message("m1", "c1", Role::User)])
            .await
            .unwrap();
        store.create_stream_id("s1", "c1").await.unwrap();

        let deleted = store.delete_chat("c1").await.unwrap();
        assert!(deleted.is_some());
        assert!(store.messages_for_chat("c1").await.unwrap().is_empty());
        assert!(store.latest_stream_id("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_stream_id_wins() {
        let store = MemoryStore::new();
        store.save_chat(chat("c1", "u1")).await.unwrap();
        store.create_stream_id("s1", "c1").await.unwrap();
        store.create_stream_id("s2", "c1").await.unwrap();

        assert_eq!(
            store.latest_stream_id("c1").await.unwrap().as_deref(),
            Some("s2")
        );
    }

    #[tokio::test]
    async fn test_message_count_scoped_to_user_and_role() {
        let store = MemoryStore::new();
        store.save_chat(chat("c1", "u1")).await.unwrap();
        store.save_chat(chat("c2", "u2")).await.unwrap();
        store
            .save_messages(vec![
                message("m1", "c1", Role::User),
                message("m2", "c1", Role::Assistant),
                message("m3", "c2", Role::User),
            ])
            .await
            .unwrap();

        let since = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(
            store
                .message_count_since("u1", since, Role::User)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_old_messages_fall_out_of_window() {
        let store = MemoryStore::new();
        store.save_chat(chat("c1", "u1")).await.unwrap();

        let mut old = message("m1", "c1", Role::User);
        old.created_at = Utc::now() - chrono::Duration::hours(48);
        store.save_messages(vec![old]).await.unwrap();

        let since = Utc::now() - chrono::Duration::hours(24);
        assert_eq!(
            store
                .message_count_since("u1", since, Role::User)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_update_last_usage_requires_chat() {
        let store = MemoryStore::new();
        let usage = UsageSummary::tokens_only(Default::default());
        assert!(store.update_chat_last_usage("nope", usage).await.is_err());
    }
}
