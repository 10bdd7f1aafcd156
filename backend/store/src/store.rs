use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use emberchat_core::{ChatError, Conversation, ConversationSummary, Role, StoredMessage};

/// Abstract interface for conversation persistence.
///
/// Writes are serialized per conversation by the implementation; a turn's
/// user/assistant pair commits atomically or not at all.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a new empty conversation.
    async fn create(&self, title: &str) -> Result<Conversation, ChatError>;

    /// Append one finalized turn (user message + assistant reply) and bump
    /// the conversation's `updated_at`. Both messages commit together.
    async fn append_turn(
        &self,
        conversation_id: Uuid,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), ChatError>;

    /// List conversations, most recently updated first.
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ConversationSummary>, ChatError>;

    /// Fetch a conversation with its ordered messages.
    async fn get(&self, id: Uuid) -> Result<Option<Conversation>, ChatError>;

    /// Delete a conversation and its messages. Returns false if unknown.
    async fn delete(&self, id: Uuid) -> Result<bool, ChatError>;
}

struct Inner {
    conversations: HashMap<Uuid, Conversation>,
    next_message_id: i64,
}

/// Simple in-memory store for tests.
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                conversations: HashMap::new(),
                next_message_id: 1,
            })),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn create(&self, title: &str) -> Result<Conversation, ChatError> {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        };
        let mut inner = self.inner.write().unwrap();
        inner
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn append_turn(
        &self,
        conversation_id: Uuid,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), ChatError> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_message_id;
        inner.next_message_id += 2;
        let conversation = inner
            .conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| ChatError::Store(format!("unknown conversation: {conversation_id}")))?;
        let now = Utc::now();
        conversation.messages.push(StoredMessage {
            id,
            role: Role::User,
            content: user_text.to_string(),
            created_at: now,
        });
        conversation.messages.push(StoredMessage {
            id: id + 1,
            role: Role::Assistant,
            content: assistant_text.to_string(),
            created_at: now,
        });
        conversation.updated_at = now;
        Ok(())
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ConversationSummary>, ChatError> {
        let inner = self.inner.read().unwrap();
        let mut summaries: Vec<ConversationSummary> = inner
            .conversations
            .values()
            .map(|c| ConversationSummary {
                id: c.id,
                title: c.title.clone(),
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries.into_iter().skip(skip).take(limit).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Conversation>, ChatError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.conversations.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ChatError> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.conversations.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_append_get() {
        let store = InMemoryStore::new();
        let conversation = store.create("Greetings").await.unwrap();
        store
            .append_turn(conversation.id, "Hi", "Hello")
            .await
            .unwrap();

        let loaded = store.get(conversation.id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[0].role, Role::User);
        assert_eq!(loaded.messages[1].content, "Hello");
        assert!(loaded.updated_at >= loaded.created_at);
    }

    #[tokio::test]
    async fn test_append_to_unknown_conversation_fails() {
        let store = InMemoryStore::new();
        let err = store
            .append_turn(Uuid::new_v4(), "Hi", "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Store(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();
        let conversation = store.create("Bye").await.unwrap();
        assert!(store.delete(conversation.id).await.unwrap());
        assert!(!store.delete(conversation.id).await.unwrap());
        assert!(store.get(conversation.id).await.unwrap().is_none());
    }
}
