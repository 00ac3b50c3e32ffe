use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use time::OffsetDateTime;

use super::{
    Conversation, ConversationId, ConversationStore, Message, MessageId, NewMessage, StoreError,
    StoreResult,
};

#[derive(Default)]
struct Tables {
    conversations: HashMap<ConversationId, Conversation>,
    messages: HashMap<MessageId, Message>,
    next_conversation_id: ConversationId,
    next_message_id: MessageId,
}

/// In-process store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_conversation(
        &self,
        direct_line_conversation_id: &str,
    ) -> StoreResult<Conversation> {
        let mut tables = self.tables.write();
        tables.next_conversation_id += 1;
        let now = OffsetDateTime::now_utc();
        let conversation = Conversation {
            id: tables.next_conversation_id,
            direct_line_conversation_id: direct_line_conversation_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(&self, id: ConversationId) -> StoreResult<Option<Conversation>> {
        Ok(self.tables.read().conversations.get(&id).cloned())
    }

    async fn get_conversation_by_direct_line_id(
        &self,
        direct_line_conversation_id: &str,
    ) -> StoreResult<Option<Conversation>> {
        Ok(self
            .tables
            .read()
            .conversations
            .values()
            .find(|c| c.direct_line_conversation_id == direct_line_conversation_id)
            .cloned())
    }

    async fn create_message(&self, message: NewMessage) -> StoreResult<Message> {
        let mut tables = self.tables.write();
        let now = OffsetDateTime::now_utc();

        let conversation = tables
            .conversations
            .get_mut(&message.conversation_id)
            .ok_or(StoreError::ConversationNotFound(message.conversation_id))?;
        conversation.updated_at = now;

        tables.next_message_id += 1;
        let stored = Message {
            id: tables.next_message_id,
            conversation_id: message.conversation_id,
            text: message.text,
            sender: message.sender,
            message_type: message.message_type,
            timestamp: now,
        };
        tables.messages.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_messages_by_conversation_id(
        &self,
        conversation_id: ConversationId,
    ) -> StoreResult<Vec<Message>> {
        let mut messages: Vec<Message> = self
            .tables
            .read()
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn clear_conversation_messages(
        &self,
        conversation_id: ConversationId,
    ) -> StoreResult<()> {
        self.tables
            .write()
            .messages
            .retain(|_, m| m.conversation_id != conversation_id);
        Ok(())
    }
}
