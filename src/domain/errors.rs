//! Domain errors for the intent inference workflow.

use thiserror::Error;

/// Domain-level errors surfaced to the host of the workflow.
///
/// Collaborator failures never show up here: the workflow steps absorb them
/// into degraded specifications or failed validation results.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("State mismatch: expected {expected}, conversation is {actual}")]
    StateMismatch { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Workflow step limit exceeded for conversation {0}")]
    StepLimitExceeded(String),
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
