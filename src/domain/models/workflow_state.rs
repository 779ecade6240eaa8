//! Workflow state machine types.
//!
//! ```text
//! Extract | Revise → Validate → Accumulate → (Extract | Revise)   budget left
//!                             ↘ PrepareReview → AwaitingReview
//! AwaitingReview → Finalize → Approved
//!                ↘ Rejected → Revise
//! ```

use serde::{Deserialize, Serialize};

use super::validation::ValidationResult;

/// Why a conversation is paused for a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    /// Validation passed; the reviewer confirms.
    Approval,
    /// Validation never passed, or the input was unusable.
    Forced,
}

/// Position of a conversation in the intent workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    /// Build a spec from scratch out of the user text.
    Extract,
    /// Apply user feedback to the last spec.
    Revise,
    /// Probe URLs and ask the judge.
    Validate,
    /// Fold a failed validation into the hints and count the attempt.
    Accumulate { result: ValidationResult },
    /// Mark the spec for review.
    PrepareReview {
        forced: bool,
        unhealthy_urls: Vec<String>,
    },
    /// Paused until the reviewer decides.
    AwaitingReview { kind: ReviewKind },
    /// Reviewer said no; the feedback becomes a hint.
    Rejected { feedback: Option<String> },
    /// Reviewer said yes.
    Finalize,
    /// Spec approved and ready for hand-off.
    Approved,
    /// Conversation cancelled or timed out.
    Abandoned,
}

impl WorkflowState {
    /// Stable snake-case name for logs and output.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Revise => "revise",
            Self::Validate => "validate",
            Self::Accumulate { .. } => "accumulate",
            Self::PrepareReview { .. } => "prepare_review",
            Self::AwaitingReview { .. } => "awaiting_review",
            Self::Rejected { .. } => "rejected",
            Self::Finalize => "finalize",
            Self::Approved => "approved",
            Self::Abandoned => "abandoned",
        }
    }

    /// Whether this is a terminal state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Abandoned)
    }

    /// Whether the driver stops here and waits for outside input.
    pub const fn is_paused(&self) -> bool {
        matches!(self, Self::AwaitingReview { .. })
    }

    /// Whether the driver should yield control in this state.
    pub const fn is_resting(&self) -> bool {
        self.is_paused() || self.is_terminal()
    }
}

/// Router verdict after a validation round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Go to human review. `forced` when validation did not pass.
    HumanReview {
        forced: bool,
        unhealthy_urls: Vec<String>,
    },
    /// Accumulate critique and try again.
    Retry,
}

/// Reviewer input at the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Accept, with optional notes kept on the spec.
    Approve { notes: Option<String> },
    /// Send back for revision.
    Reject { feedback: Option<String> },
}

impl ReviewDecision {
    /// Build from a flag and free text. Blank text counts as none.
    pub fn from_parts(approved: bool, feedback: Option<String>) -> Self {
        let feedback = feedback.filter(|f| !f.trim().is_empty());
        if approved {
            Self::Approve { notes: feedback }
        } else {
            Self::Reject { feedback }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::specification::ValidationStatus;

    #[test]
    fn test_workflow_state_serde_roundtrip() {
        let state = WorkflowState::Accumulate {
            result: ValidationResult {
                is_valid: false,
                status: ValidationStatus::MissingData,
                issues: vec!["missing price".to_string()],
                clarification_questions: Vec::new(),
            },
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"state\":\"accumulate\""));
        let deserialized: WorkflowState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }

    #[test]
    fn test_terminal_and_paused() {
        assert!(WorkflowState::Approved.is_terminal());
        assert!(WorkflowState::Abandoned.is_terminal());
        assert!(!WorkflowState::Validate.is_terminal());
        let paused = WorkflowState::AwaitingReview {
            kind: ReviewKind::Forced,
        };
        assert!(paused.is_paused());
        assert!(paused.is_resting());
        assert!(!WorkflowState::Finalize.is_resting());
    }

    #[test]
    fn test_review_decision_from_parts() {
        assert_eq!(
            ReviewDecision::from_parts(false, Some("  ".to_string())),
            ReviewDecision::Reject { feedback: None }
        );
        assert_eq!(
            ReviewDecision::from_parts(true, Some("looks good".to_string())),
            ReviewDecision::Approve {
                notes: Some("looks good".to_string())
            }
        );
    }
}
