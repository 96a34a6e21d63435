//! Conversation messages and the bounded per-conversation history.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier of one chat session.
pub type ConversationId = String;

/// Who authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Written by the person chatting.
    User,
    /// Produced by the completion backend.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        })
    }
}

/// One turn of a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// When the message was created, in UTC.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A message authored by `role`, stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), created_at: Utc::now() }
    }

    /// Shorthand for `Message::new(Role::User, content)`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Shorthand for `Message::new(Role::Assistant, content)`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered message history of one conversation, capped at `max_messages`.
///
/// Pushing past the cap evicts the oldest messages first; the survivors keep
/// their relative order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMemory {
    conversation_id: ConversationId,
    max_messages: usize,
    messages: VecDeque<Message>,
}

impl ConversationMemory {
    /// An empty history. `max_messages` is validated by the owning store.
    pub fn new(conversation_id: impl Into<ConversationId>, max_messages: usize) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            max_messages,
            messages: VecDeque::new(),
        }
    }

    /// The conversation this history belongs to.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// The retention cap.
    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Append `message`, returning how many old messages were evicted.
    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push_back(message);
        let overflow = self.messages.len().saturating_sub(self.max_messages);
        self.messages.drain(..overflow);
        overflow
    }

    /// Messages oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Number of messages held.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no message is held.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Consume the history, returning its messages oldest first.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages.into()
    }
}
