//! Service layer: the workflow steps and the driver that sequences them.

pub mod conversation_service;
pub mod critique;
pub mod extraction;
pub mod human_review;
pub mod llm_output;
pub mod prompts;
pub mod revision;
pub mod router;
pub mod validation;
pub mod workflow_engine;

pub use conversation_service::{ConversationService, TurnOutcome};
pub use extraction::ExtractionStep;
pub use revision::RevisionStep;
pub use validation::ValidationStep;
pub use workflow_engine::WorkflowEngine;
