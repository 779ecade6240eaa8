//! Conversation persistence port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Conversation;

/// Storage for in-flight conversations.
///
/// The default adapter is process-local memory; anything that can hold
/// serialized [`Conversation`] records can stand in.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Look up a conversation. `None` when unknown.
    async fn get(&self, conversation_id: &str) -> DomainResult<Option<Conversation>>;

    /// Insert or replace.
    async fn put(&self, conversation: Conversation) -> DomainResult<()>;

    /// Returns the removed record, if any.
    async fn delete(&self, conversation_id: &str) -> DomainResult<Option<Conversation>>;

    /// Snapshot of every stored conversation.
    async fn list(&self) -> DomainResult<Vec<Conversation>>;
}
