//! Host-facing entry point for the intent workflow.
//!
//! Owns the conversation store and serializes inputs per conversation:
//! two calls for the same id run one after the other, calls for different
//! ids run concurrently.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Conversation, ConversationContext, ReviewDecision, Specification, ValidationResult,
    WorkflowState,
};
use crate::domain::ports::ConversationStore;
use crate::services::human_review::{is_approved, process_decision};
use crate::services::router::initial_state;
use crate::services::workflow_engine::WorkflowEngine;

/// What the host gets back after every input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Id to pass back on the next input.
    pub conversation_id: String,
    /// State the conversation is resting in.
    pub state: WorkflowState,
    /// Latest specification.
    pub specification: Specification,
    /// Outcome of the last validation round, if one ran.
    pub validation: Option<ValidationResult>,
    /// True while paused for a reviewer.
    pub needs_human_input: bool,
    /// Validation rounds spent on the current request.
    pub iteration_count: u32,
}

impl TryFrom<&Conversation> for TurnOutcome {
    type Error = DomainError;

    fn try_from(conversation: &Conversation) -> Result<Self, Self::Error> {
        let specification = conversation
            .specification()
            .cloned()
            .ok_or_else(|| DomainError::StateMismatch {
                expected: "conversation with a specification".to_string(),
                actual: conversation.state.name().to_string(),
            })?;
        Ok(Self {
            conversation_id: conversation.id().to_string(),
            state: conversation.state.clone(),
            specification,
            validation: conversation.last_validation.clone(),
            needs_human_input: conversation.state.is_paused(),
            iteration_count: conversation.context.iteration_count(),
        })
    }
}

type LockTable = std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>;

/// Exclusive access to one conversation.
///
/// On drop the table entry is removed when no other caller holds or waits
/// on it, so the table only tracks conversations with calls in flight.
struct ConversationGuard<'a> {
    locks: &'a LockTable,
    conversation_id: String,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ConversationGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the table, one here.
        let idle = locks.get(&self.conversation_id).is_some_and(|entry| {
            Arc::ptr_eq(entry, &self.lock) && Arc::strong_count(entry) == 2
        });
        if idle {
            locks.remove(&self.conversation_id);
        }
    }
}

/// Multi-conversation front end over a [`WorkflowEngine`] and a
/// [`ConversationStore`].
pub struct ConversationService {
    engine: Arc<WorkflowEngine>,
    store: Arc<dyn ConversationStore>,
    locks: LockTable,
    max_iterations: u32,
}

impl ConversationService {
    /// New conversations get `max_iterations` validation rounds per request.
    pub fn new(
        engine: Arc<WorkflowEngine>,
        store: Arc<dyn ConversationStore>,
        max_iterations: u32,
    ) -> Self {
        Self {
            engine,
            store,
            locks: std::sync::Mutex::new(HashMap::new()),
            max_iterations,
        }
    }

    async fn lock_for(&self, conversation_id: &str) -> ConversationGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let guard = lock.clone().lock_owned().await;
        ConversationGuard {
            locks: &self.locks,
            conversation_id: conversation_id.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    async fn load(&self, conversation_id: &str) -> DomainResult<Conversation> {
        self.store
            .get(conversation_id)
            .await?
            .ok_or_else(|| DomainError::ConversationNotFound(conversation_id.to_string()))
    }

    async fn drive(&self, mut conversation: Conversation) -> DomainResult<TurnOutcome> {
        self.engine.run(&mut conversation).await?;
        let outcome = TurnOutcome::try_from(&conversation)?;
        self.store.put(conversation).await?;
        Ok(outcome)
    }

    /// Open a new conversation with a request.
    #[instrument(skip(self, query))]
    pub async fn start(&self, query: &str) -> DomainResult<TurnOutcome> {
        let conversation_id = Uuid::new_v4().to_string();
        let _guard = self.lock_for(&conversation_id).await;

        let mut context = ConversationContext::new(conversation_id.clone(), self.max_iterations);
        context.begin_query(query);
        let mut conversation = Conversation::new(context);
        conversation.state = initial_state(&conversation.context);

        info!(%conversation_id, "conversation started");
        self.drive(conversation).await
    }

    /// Replace the request of an existing conversation with a new one.
    #[instrument(skip(self, query))]
    pub async fn submit_query(&self, conversation_id: &str, query: &str) -> DomainResult<TurnOutcome> {
        let _guard = self.lock_for(conversation_id).await;

        let mut conversation = self.load(conversation_id).await?;
        if !conversation.state.is_resting() || conversation.state == WorkflowState::Abandoned {
            return Err(state_mismatch("awaiting_review or approved", &conversation.state));
        }
        conversation.context.begin_query(query);
        conversation.last_validation = None;
        conversation.state = initial_state(&conversation.context);
        self.drive(conversation).await
    }

    /// Feedback on the current specification.
    #[instrument(skip(self, feedback))]
    pub async fn submit_feedback(
        &self,
        conversation_id: &str,
        feedback: &str,
    ) -> DomainResult<TurnOutcome> {
        let _guard = self.lock_for(conversation_id).await;

        let mut conversation = self.load(conversation_id).await?;
        if !matches!(
            conversation.state,
            WorkflowState::AwaitingReview { .. } | WorkflowState::Approved
        ) {
            return Err(state_mismatch("awaiting_review or approved", &conversation.state));
        }
        conversation.context.begin_feedback(feedback);
        conversation.state = initial_state(&conversation.context);
        self.drive(conversation).await
    }

    /// Reviewer decision on a paused conversation.
    #[instrument(skip(self, feedback))]
    pub async fn submit_decision(
        &self,
        conversation_id: &str,
        approved: bool,
        feedback: Option<String>,
    ) -> DomainResult<TurnOutcome> {
        let _guard = self.lock_for(conversation_id).await;

        let mut conversation = self.load(conversation_id).await?;
        process_decision(&mut conversation, ReviewDecision::from_parts(approved, feedback))?;
        self.drive(conversation).await
    }

    /// Current record of a conversation.
    pub async fn get(&self, conversation_id: &str) -> DomainResult<Conversation> {
        self.load(conversation_id).await
    }

    /// Every stored conversation.
    pub async fn list(&self) -> DomainResult<Vec<Conversation>> {
        self.store.list().await
    }

    /// Cancel a conversation. The record, spec included, is kept.
    #[instrument(skip(self))]
    pub async fn abandon(&self, conversation_id: &str) -> DomainResult<Conversation> {
        let _guard = self.lock_for(conversation_id).await;

        let mut conversation = self.load(conversation_id).await?;
        conversation.state = WorkflowState::Abandoned;
        conversation.touch();
        self.store.put(conversation.clone()).await?;
        info!("conversation abandoned");
        Ok(conversation)
    }

    /// Drop conversations idle for longer than `ttl`. Returns the removed records.
    ///
    /// Idleness is checked again under the conversation lock against the
    /// stored record, so a conversation touched after the listing survives.
    pub async fn expire_idle(&self, ttl: Duration) -> DomainResult<Vec<Conversation>> {
        let mut expired = Vec::new();
        for listed in self.store.list().await? {
            if !is_idle(listed.updated_at, Utc::now(), ttl) {
                continue;
            }
            let id = listed.id().to_string();
            let _guard = self.lock_for(&id).await;
            let Some(current) = self.store.get(&id).await? else {
                continue;
            };
            if !is_idle(current.updated_at, Utc::now(), ttl) {
                debug!(conversation_id = %id, "conversation active again, kept");
                continue;
            }
            if let Some(removed) = self.store.delete(&id).await? {
                expired.push(removed);
            }
        }
        if !expired.is_empty() {
            warn!(count = expired.len(), "expired idle conversations");
        }
        Ok(expired)
    }

    /// Serialized approved specification for the execution pipeline.
    pub async fn handoff(&self, conversation_id: &str) -> DomainResult<String> {
        let conversation = self.load(conversation_id).await?;
        if !is_approved(&conversation.state) {
            return Err(state_mismatch("approved", &conversation.state));
        }
        let spec = conversation
            .specification()
            .ok_or_else(|| state_mismatch("approved specification", &conversation.state))?;
        Ok(spec.to_handoff_json()?)
    }
}

fn is_idle(updated_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now.signed_duration_since(updated_at)
        .to_std()
        .is_ok_and(|idle| idle >= ttl)
}

fn state_mismatch(expected: &str, actual: &WorkflowState) -> DomainError {
    DomainError::StateMismatch {
        expected: expected.to_string(),
        actual: actual.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::inference::ScriptedInferenceClient;
    use crate::adapters::prober::FixedUrlProber;
    use crate::adapters::store::InMemoryConversationStore;
    use crate::domain::ports::PromptKind;
    use async_trait::async_trait;

    /// Lists records as they looked an hour ago while `get` sees the live copy.
    struct StaleListingStore {
        inner: InMemoryConversationStore,
    }

    #[async_trait]
    impl ConversationStore for StaleListingStore {
        async fn get(&self, conversation_id: &str) -> DomainResult<Option<Conversation>> {
            self.inner.get(conversation_id).await
        }

        async fn put(&self, conversation: Conversation) -> DomainResult<()> {
            self.inner.put(conversation).await
        }

        async fn delete(&self, conversation_id: &str) -> DomainResult<Option<Conversation>> {
            self.inner.delete(conversation_id).await
        }

        async fn list(&self) -> DomainResult<Vec<Conversation>> {
            let mut listed = self.inner.list().await?;
            for conversation in &mut listed {
                conversation.updated_at -= chrono::Duration::hours(1);
            }
            Ok(listed)
        }
    }

    fn lock_count(svc: &ConversationService) -> usize {
        svc.locks.lock().unwrap().len()
    }

    fn service(client: Arc<ScriptedInferenceClient>) -> ConversationService {
        let engine = Arc::new(WorkflowEngine::new(client, Arc::new(FixedUrlProber::all_healthy())));
        ConversationService::new(engine, Arc::new(InMemoryConversationStore::new()), 5)
    }

    #[tokio::test]
    async fn test_unknown_conversation() {
        let svc = service(Arc::new(ScriptedInferenceClient::new()));
        let err = svc.submit_feedback("nope", "more").await.unwrap_err();
        assert!(matches!(err, DomainError::ConversationNotFound(_)));
    }

    #[tokio::test]
    async fn test_abandon_keeps_spec_and_blocks_feedback() {
        let client = Arc::new(ScriptedInferenceClient::new());
        let svc = service(client);
        let outcome = svc.start("").await.unwrap();

        let abandoned = svc.abandon(&outcome.conversation_id).await.unwrap();
        assert_eq!(abandoned.state, WorkflowState::Abandoned);
        assert!(abandoned.specification().is_some());

        let err = svc
            .submit_feedback(&outcome.conversation_id, "add rating")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::StateMismatch { .. }));
    }

    #[tokio::test]
    async fn test_handoff_requires_approval() {
        let client = Arc::new(ScriptedInferenceClient::new());
        client.push_text(
            PromptKind::Extract,
            r#"{"target_urls": ["https://example.com"], "fields_to_extract": ["price"]}"#,
        );
        client.push_text(PromptKind::Judge, r#"{"is_valid": true}"#);
        let svc = service(client);

        let outcome = svc.start("Get price from https://example.com").await.unwrap();
        assert!(svc.handoff(&outcome.conversation_id).await.is_err());

        svc.submit_decision(&outcome.conversation_id, true, None)
            .await
            .unwrap();
        let json = svc.handoff(&outcome.conversation_id).await.unwrap();
        assert!(json.contains("\"validation_status\": \"user_approved\""));
    }

    #[tokio::test]
    async fn test_expire_idle_removes_old_conversations() {
        let svc = service(Arc::new(ScriptedInferenceClient::new()));
        let outcome = svc.start("").await.unwrap();

        assert!(svc.expire_idle(Duration::from_secs(3600)).await.unwrap().is_empty());
        let expired = svc.expire_idle(Duration::ZERO).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert!(matches!(
            svc.get(&outcome.conversation_id).await,
            Err(DomainError::ConversationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_expire_idle_keeps_conversation_touched_since_listing() {
        let client = Arc::new(ScriptedInferenceClient::new());
        let engine = Arc::new(WorkflowEngine::new(client, Arc::new(FixedUrlProber::all_healthy())));
        let store = Arc::new(StaleListingStore {
            inner: InMemoryConversationStore::new(),
        });
        let svc = ConversationService::new(engine, store, 5);
        let outcome = svc.start("").await.unwrap();

        let expired = svc.expire_idle(Duration::from_secs(1800)).await.unwrap();

        assert!(expired.is_empty());
        assert!(svc.get(&outcome.conversation_id).await.is_ok());
        assert_eq!(lock_count(&svc), 0);
    }

    #[test]
    fn test_is_idle_boundaries() {
        let now = Utc::now();
        let ttl = Duration::from_secs(60);
        assert!(is_idle(now - chrono::Duration::seconds(61), now, ttl));
        assert!(!is_idle(now - chrono::Duration::seconds(59), now, ttl));
        assert!(!is_idle(now + chrono::Duration::seconds(5), now, ttl));
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_each_call() {
        let client = Arc::new(ScriptedInferenceClient::new());
        client.push_text(
            PromptKind::Extract,
            r#"{"target_urls": ["https://example.com"], "fields_to_extract": ["price"]}"#,
        );
        client.push_text(PromptKind::Judge, r#"{"is_valid": true}"#);
        let svc = service(client);

        let approved = svc.start("Get price from https://example.com").await.unwrap();
        let abandoned = svc.start("").await.unwrap();
        assert_eq!(lock_count(&svc), 0);

        svc.submit_decision(&approved.conversation_id, true, None)
            .await
            .unwrap();
        svc.abandon(&abandoned.conversation_id).await.unwrap();
        assert_eq!(lock_count(&svc), 0);

        assert!(svc.submit_feedback("missing", "more").await.is_err());
        assert_eq!(lock_count(&svc), 0);
    }

    #[tokio::test]
    async fn test_lock_entry_kept_while_another_caller_waits() {
        let svc = service(Arc::new(ScriptedInferenceClient::new()));
        let first = svc.lock_for("c1").await;

        let waiting = svc.lock_for("c1");
        tokio::pin!(waiting);
        assert!(futures::poll!(waiting.as_mut()).is_pending());

        drop(first);
        assert_eq!(lock_count(&svc), 1);

        let second = waiting.await;
        drop(second);
        assert_eq!(lock_count(&svc), 0);
    }
}
