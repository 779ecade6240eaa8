//! Inference collaborator port.
//!
//! The workflow needs three kinds of text completion: extracting a spec from
//! a request, turning feedback into diff ops, and judging a spec. Backends
//! (Anthropic API, offline heuristics, scripted test doubles) implement
//! [`InferenceClient`]; the steps never see which one they talk to.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Which question is being asked of the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Turn a request into a specification.
    Extract,
    /// Turn feedback into diff ops.
    Revise,
    /// Assess a specification.
    Judge,
}

impl PromptKind {
    /// Snake-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Revise => "revise",
            Self::Judge => "judge",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single collaborator call.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Which question this is
    pub kind: PromptKind,
    /// System instructions
    pub system: String,
    /// Rendered user prompt
    pub prompt: String,
    /// Structured inputs the prompt was rendered from
    pub inputs: Value,
}

/// Errors returned by inference backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Empty response from inference backend")]
    EmptyResponse,
}

impl InferenceError {
    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            429 => Self::RateLimited,
            401 | 403 => Self::Auth(body),
            408 => Self::Timeout,
            500..=599 => Self::Server(status, body),
            _ => Self::InvalidRequest(format!("HTTP {status}: {body}")),
        }
    }

    /// Returns true if this error is transient and should be retried
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Server(..) | Self::Network(_) | Self::Timeout
        )
    }
}

/// Text-completion collaborator.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Run one prompt and return the raw completion text.
    async fn invoke(&self, request: &InferenceRequest) -> Result<String, InferenceError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(InferenceError::RateLimited.is_transient());
        assert!(InferenceError::Server(503, "busy".to_string()).is_transient());
        assert!(InferenceError::Timeout.is_transient());
        assert!(InferenceError::Network("reset".to_string()).is_transient());
        assert!(!InferenceError::Auth("bad key".to_string()).is_transient());
        assert!(!InferenceError::EmptyResponse.is_transient());
    }

    #[test]
    fn test_from_status() {
        assert_eq!(InferenceError::from_status(429, ""), InferenceError::RateLimited);
        assert!(matches!(InferenceError::from_status(529, "overloaded"), InferenceError::Server(529, _)));
        assert!(matches!(InferenceError::from_status(401, "nope"), InferenceError::Auth(_)));
        assert!(matches!(InferenceError::from_status(400, "bad"), InferenceError::InvalidRequest(_)));
    }
}
