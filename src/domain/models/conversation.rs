//! Conversation record kept by the conversation store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::ConversationContext;
use super::specification::Specification;
use super::validation::ValidationResult;
use super::workflow_state::WorkflowState;

/// Everything the workflow knows about one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Working memory.
    pub context: ConversationContext,
    /// Where the workflow stands.
    pub state: WorkflowState,
    /// Verdict of the most recent validation round.
    #[serde(default)]
    pub last_validation: Option<ValidationResult>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last transition or input. Drives idle expiry.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// New record starting at extraction.
    pub fn new(context: ConversationContext) -> Self {
        let now = Utc::now();
        Self {
            context,
            state: WorkflowState::Extract,
            last_validation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Conversation id.
    pub fn id(&self) -> &str {
        self.context.conversation_id()
    }

    /// Working specification, if extraction has run.
    pub const fn specification(&self) -> Option<&Specification> {
        self.context.last_spec()
    }

    /// Mark the record as active now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
