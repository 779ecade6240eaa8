//! Retry decorator for inference clients.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{InferenceClient, InferenceError, InferenceRequest};
use crate::infrastructure::retry::RetryPolicy;

/// Decorator that retries transient failures of the wrapped client.
pub struct RetryingInferenceClient {
    inner: Arc<dyn InferenceClient>,
    policy: RetryPolicy,
}

impl RetryingInferenceClient {
    /// Wrap `inner` so transient failures are retried under `policy`.
    pub fn new(inner: Arc<dyn InferenceClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl InferenceClient for RetryingInferenceClient {
    async fn invoke(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        self.policy.execute(|| self.inner.invoke(request)).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
