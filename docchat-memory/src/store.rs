//! Conversation memory stores.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{MemoryError, Result};
use crate::message::{ConversationId, ConversationMemory, Message};

/// Default number of messages kept per conversation.
pub const DEFAULT_MAX_MESSAGES: usize = 30;

/// Per-conversation message history.
///
/// Calls for the same conversation are linearized. Calls for different
/// conversations never wait on each other's history.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Append one message, evicting the oldest ones past the cap.
    async fn append(&self, conversation_id: &str, message: Message);

    /// Append a user message and the assistant reply as one step.
    ///
    /// A concurrent [`get`](Self::get) observes both messages or neither.
    async fn append_exchange(&self, conversation_id: &str, user: Message, assistant: Message);

    /// Snapshot of the history; empty for an unknown conversation.
    async fn get(&self, conversation_id: &str) -> ConversationMemory;

    /// Forget the conversation.
    async fn clear(&self, conversation_id: &str);
}

/// Process-local [`MemoryStore`].
///
/// Histories are created on first append and live until cleared or the store
/// is dropped. Nothing expires idle conversations, so a long-running process
/// grows with the number of distinct ids it has seen.
#[derive(Debug, Clone)]
pub struct InMemoryMemoryStore {
    max_messages: usize,
    conversations: Arc<RwLock<HashMap<ConversationId, Arc<Mutex<ConversationMemory>>>>>,
}

impl InMemoryMemoryStore {
    /// A store keeping at most `max_messages` per conversation.
    ///
    /// # Errors
    ///
    /// [`MemoryError::InvalidParameters`] if `max_messages` is zero.
    pub fn new(max_messages: usize) -> Result<Self> {
        if max_messages == 0 {
            return Err(MemoryError::InvalidParameters(
                "max_messages must be greater than 0".to_string(),
            ));
        }
        Ok(Self { max_messages, conversations: Arc::default() })
    }

    /// Per-conversation retention cap.
    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Number of conversations currently held.
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }

    async fn entry(&self, conversation_id: &str) -> Arc<Mutex<ConversationMemory>> {
        if let Some(memory) = self.conversations.read().await.get(conversation_id) {
            return memory.clone();
        }
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| {
                debug!(conversation_id, "creating conversation memory");
                Arc::new(Mutex::new(ConversationMemory::new(conversation_id, self.max_messages)))
            })
            .clone()
    }
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self { max_messages: DEFAULT_MAX_MESSAGES, conversations: Arc::default() }
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn append(&self, conversation_id: &str, message: Message) {
        let entry = self.entry(conversation_id).await;
        let mut memory = entry.lock().await;
        let evicted = memory.push(message);
        debug!(conversation_id, len = memory.len(), evicted, "appended message");
    }

    async fn append_exchange(&self, conversation_id: &str, user: Message, assistant: Message) {
        let entry = self.entry(conversation_id).await;
        let mut memory = entry.lock().await;
        let evicted = memory.push(user) + memory.push(assistant);
        debug!(conversation_id, len = memory.len(), evicted, "appended exchange");
    }

    async fn get(&self, conversation_id: &str) -> ConversationMemory {
        let entry = self.conversations.read().await.get(conversation_id).cloned();
        match entry {
            Some(memory) => memory.lock().await.clone(),
            None => ConversationMemory::new(conversation_id, self.max_messages),
        }
    }

    async fn clear(&self, conversation_id: &str) {
        if self.conversations.write().await.remove(conversation_id).is_some() {
            debug!(conversation_id, "cleared conversation memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn zero_cap_is_rejected() {
        assert!(matches!(InMemoryMemoryStore::new(0), Err(MemoryError::InvalidParameters(_))));
        assert_eq!(InMemoryMemoryStore::default().max_messages(), DEFAULT_MAX_MESSAGES);
    }

    #[tokio::test]
    async fn unknown_conversation_is_empty() {
        let store = InMemoryMemoryStore::default();
        let memory = store.get("nobody").await;
        assert!(memory.is_empty());
        assert_eq!(memory.conversation_id(), "nobody");
        assert_eq!(store.conversation_count().await, 0);
    }

    #[tokio::test]
    async fn keeps_the_last_thirty_of_thirty_one() {
        let store = InMemoryMemoryStore::default();
        for i in 1..=31 {
            store.append("c", Message::user(format!("m{i}"))).await;
        }

        let memory = store.get("c").await;
        assert_eq!(memory.len(), 30);
        let contents: Vec<_> = memory.messages().map(|m| m.content.clone()).collect();
        let expected: Vec<_> = (2..=31).map(|i| format!("m{i}")).collect();
        assert_eq!(contents, expected);
    }

    #[tokio::test]
    async fn exchange_is_user_then_assistant() {
        let store = InMemoryMemoryStore::new(4).unwrap();
        store.append_exchange("c", Message::user("q"), Message::assistant("a")).await;

        let roles: Vec<_> = store.get("c").await.messages().map(|m| m.role).collect();
        assert_eq!(roles, [Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn clear_forgets_history() {
        let store = InMemoryMemoryStore::default();
        store.append("c", Message::user("hello")).await;
        store.clear("c").await;
        assert!(store.get("c").await.is_empty());
        assert_eq!(store.conversation_count().await, 0);
    }
}
