//! Intent inference: turns a free-text scraping request into a validated,
//! human-approved specification for a downstream scraper.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): specification, conversation context,
//!   workflow states and the ports the workflow depends on
//! - **Service Layer** (`services`): extraction, revision and validation
//!   steps, the router, the review gate and the workflow driver
//! - **Adapters** (`adapters`): Anthropic and offline inference clients,
//!   the HTTP URL prober and the in-memory conversation store
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging and
//!   retry plumbing
//! - **CLI Layer** (`cli`): the `intent` command
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use intent_inference::adapters::inference::OfflineInferenceClient;
//! use intent_inference::adapters::prober::FixedUrlProber;
//! use intent_inference::adapters::store::InMemoryConversationStore;
//! use intent_inference::{ConversationService, WorkflowEngine};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let engine = Arc::new(WorkflowEngine::new(
//!     Arc::new(OfflineInferenceClient::new()),
//!     Arc::new(FixedUrlProber::all_healthy()),
//! ));
//! let service = ConversationService::new(engine, Arc::new(InMemoryConversationStore::new()), 5);
//! let outcome = service.start("Get prices from https://example.com").await?;
//! service.submit_decision(&outcome.conversation_id, true, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, Conversation, ConversationContext, FieldToExtract, ReviewDecision, ReviewKind,
    Specification, UrlHealth, ValidationResult, ValidationStatus, WorkflowState,
};
pub use domain::ports::{ConversationStore, InferenceClient, InferenceError, UrlProber};
pub use services::{ConversationService, TurnOutcome, WorkflowEngine};
