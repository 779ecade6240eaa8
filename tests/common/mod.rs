//! Common test utilities for integration tests
//!
//! Shared fixtures for the workflow tests: scripted collaborators, canned
//! collaborator replies and a service wired from them.

#![allow(dead_code)]

use std::sync::Arc;

use intent_inference::adapters::inference::ScriptedInferenceClient;
use intent_inference::adapters::prober::FixedUrlProber;
use intent_inference::adapters::store::InMemoryConversationStore;
use intent_inference::{ConversationService, WorkflowEngine};

pub const PRICE_EXTRACTION: &str = r#"{
    "target_urls": ["https://example.com"],
    "fields_to_extract": [{"name": "price", "description": "Listed price"}],
    "technical_requirements": ["html_parsing"]
}"#;

pub const VALID_VERDICT: &str = r#"{"is_valid": true, "issues": []}"#;

pub const MISSING_FIELD_VERDICT: &str =
    r#"{"is_valid": false, "issues": ["Missing field: currency"], "needs_clarification": false}"#;

pub const ADD_RATING_REVISION: &str = r#"```json
{
  "changes": [{"type": "add_field", "field_name": "rating", "description": "Star rating"}],
  "reasoning": "User asked for ratings"
}
```"#;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A service backed by the given client and prober, in-memory store.
pub fn service_with(
    client: Arc<ScriptedInferenceClient>,
    prober: FixedUrlProber,
    max_iterations: u32,
) -> ConversationService {
    let engine = Arc::new(WorkflowEngine::new(client, Arc::new(prober)));
    ConversationService::new(
        engine,
        Arc::new(InMemoryConversationStore::new()),
        max_iterations,
    )
}
