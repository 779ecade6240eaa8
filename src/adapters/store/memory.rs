//! Process-local conversation store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::Conversation;
use crate::domain::ports::ConversationStore;

/// Process-local conversation store. Contents are lost on restart.
#[derive(Default, Clone)]
pub struct InMemoryConversationStore {
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
}

impl InMemoryConversationStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, conversation_id: &str) -> DomainResult<Option<Conversation>> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(conversation_id).cloned())
    }

    async fn put(&self, conversation: Conversation) -> DomainResult<()> {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id().to_string(), conversation);
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> DomainResult<Option<Conversation>> {
        let mut conversations = self.conversations.write().await;
        Ok(conversations.remove(conversation_id))
    }

    async fn list(&self) -> DomainResult<Vec<Conversation>> {
        let conversations = self.conversations.read().await;
        let mut all: Vec<Conversation> = conversations.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}
