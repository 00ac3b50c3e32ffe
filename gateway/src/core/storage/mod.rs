//! Conversation and message persistence.
//!
//! [`ConversationStore`] is the seam; [`MemoryStore`] is the process-local
//! implementation used by the server. Ids are allocated by the store.

mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

pub use memory::MemoryStore;

pub type ConversationId = u64;
pub type MessageId = u64;

/// Errors raised by a conversation store.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Conversation {0} not found")]
    ConversationNotFound(ConversationId),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A chat session bridged to one Direct Line conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub direct_line_conversation_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Voice,
}

/// One stored chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub text: String,
    pub sender: Sender,
    pub message_type: MessageType,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Message contents before the store assigns an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub text: String,
    pub sender: Sender,
    pub message_type: MessageType,
}

impl NewMessage {
    pub fn text(conversation_id: ConversationId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            conversation_id,
            text: text.into(),
            sender,
            message_type: MessageType::Text,
        }
    }
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, direct_line_conversation_id: &str)
    -> StoreResult<Conversation>;

    async fn get_conversation(&self, id: ConversationId) -> StoreResult<Option<Conversation>>;

    async fn get_conversation_by_direct_line_id(
        &self,
        direct_line_conversation_id: &str,
    ) -> StoreResult<Option<Conversation>>;

    /// Store a message. Fails if the conversation does not exist.
    async fn create_message(&self, message: NewMessage) -> StoreResult<Message>;

    /// Messages of a conversation, oldest first.
    async fn get_messages_by_conversation_id(
        &self,
        conversation_id: ConversationId,
    ) -> StoreResult<Vec<Message>>;

    async fn clear_conversation_messages(&self, conversation_id: ConversationId)
    -> StoreResult<()>;
}
