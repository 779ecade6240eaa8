//! Domain models.

pub mod config;
pub mod context;
pub mod conversation;
pub mod specification;
pub mod validation;
pub mod workflow_state;

pub use config::{
    Config, InferenceConfig, InferenceProvider, LoggingConfig, ProberConfig, RetryConfig,
    WorkflowConfig,
};
pub use context::{ConversationContext, DEFAULT_MAX_ITERATIONS};
pub use conversation::Conversation;
pub use specification::{
    DiffOp, FieldToExtract, Specification, UrlHealth, ValidationStatus, DEFAULT_REQUIREMENT,
};
pub use validation::{classify_issues, ValidationResult};
pub use workflow_state::{ReviewDecision, ReviewKind, RouteDecision, WorkflowState};
