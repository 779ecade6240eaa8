//! Human review gate.

use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Conversation, ReviewDecision, ReviewKind, Specification, ValidationStatus, WorkflowState,
};
use crate::services::router::route_after_review;

/// Critique recorded when a reviewer rejects without saying why.
pub const REJECTION_MARKER: &str = "Rejected by reviewer without detail";

/// Mark `spec` for review and report which kind of review it needs.
pub fn prepare_for_review(
    spec: &mut Specification,
    forced: bool,
    unhealthy_urls: &[String],
) -> ReviewKind {
    let (status, kind) = if forced {
        (ValidationStatus::NeedsHumanReview, ReviewKind::Forced)
    } else {
        (ValidationStatus::NeedsHumanApproval, ReviewKind::Approval)
    };
    spec.set_status(status);
    spec.needs_human_review = true;
    if !unhealthy_urls.is_empty() {
        spec.push_critique(format!(
            "The following URLs have accessibility issues: {}",
            unhealthy_urls.join(", ")
        ));
    }
    kind
}

/// Apply a reviewer decision to a paused conversation.
///
/// Only valid while the conversation is awaiting review; otherwise the
/// conversation is left untouched and a state mismatch is returned.
/// Approval marks the spec `user_approved`. Rejection records the feedback
/// (or a generic marker) as critique, feeds it back as the next hint and
/// counts the round as an iteration.
pub fn process_decision(conversation: &mut Conversation, decision: ReviewDecision) -> DomainResult<()> {
    if !conversation.state.is_paused() {
        return Err(DomainError::StateMismatch {
            expected: "awaiting_review".to_string(),
            actual: conversation.state.name().to_string(),
        });
    }
    let Some(spec) = conversation.context.last_spec_mut() else {
        return Err(DomainError::StateMismatch {
            expected: "specification under review".to_string(),
            actual: "no specification".to_string(),
        });
    };

    let next_state = route_after_review(&decision);
    match decision {
        ReviewDecision::Approve { notes } => {
            spec.set_status(ValidationStatus::UserApproved);
            spec.needs_human_review = false;
            spec.human_approval_notes = notes;
            info!(spec_id = spec.spec_id(), "specification approved");
        }
        ReviewDecision::Reject { feedback } => {
            let critique = feedback.as_deref().map_or_else(
                || REJECTION_MARKER.to_string(),
                |text| format!("Rejected by reviewer: {}", text.trim()),
            );
            spec.push_critique(critique.clone());
            info!(spec_id = spec.spec_id(), "specification rejected");

            let context = &mut conversation.context;
            context.add_hint(&critique);
            context.record_iteration();
            context.begin_feedback(feedback.unwrap_or_else(|| REJECTION_MARKER.to_string()));
        }
    }

    conversation.state = next_state;
    conversation.touch();
    Ok(())
}

/// Whether `state` may hand the spec off downstream.
pub const fn is_approved(state: &WorkflowState) -> bool {
    matches!(state, WorkflowState::Approved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ConversationContext, FieldToExtract};
    use std::collections::BTreeMap;

    fn paused_conversation() -> Conversation {
        let mut context = ConversationContext::new("c1", 5);
        context.begin_query("Get price from https://example.com");
        context.set_last_spec(Specification::create_new(
            "Get price from https://example.com",
            vec!["https://example.com".to_string()],
            vec![FieldToExtract::new("price")],
            BTreeMap::new(),
        ));
        let mut conversation = Conversation::new(context);
        conversation.state = WorkflowState::AwaitingReview {
            kind: ReviewKind::Approval,
        };
        conversation
    }

    #[test]
    fn test_prepare_for_review_statuses() {
        let mut spec = Specification::create_new("q", Vec::new(), Vec::new(), BTreeMap::new());
        assert_eq!(prepare_for_review(&mut spec, false, &[]), ReviewKind::Approval);
        assert_eq!(spec.validation_status, ValidationStatus::NeedsHumanApproval);

        let unhealthy = vec!["https://down.example".to_string()];
        assert_eq!(prepare_for_review(&mut spec, true, &unhealthy), ReviewKind::Forced);
        assert_eq!(spec.validation_status, ValidationStatus::NeedsHumanReview);
        assert!(spec.needs_human_review);
        assert_eq!(
            spec.critique_history().last().map(String::as_str),
            Some("The following URLs have accessibility issues: https://down.example")
        );
    }

    #[test]
    fn test_approve() {
        let mut conversation = paused_conversation();
        process_decision(
            &mut conversation,
            ReviewDecision::Approve {
                notes: Some("ship it".to_string()),
            },
        )
        .unwrap();

        let spec = conversation.specification().unwrap();
        assert_eq!(spec.validation_status, ValidationStatus::UserApproved);
        assert_eq!(spec.human_approval_notes.as_deref(), Some("ship it"));
        assert_eq!(conversation.state, WorkflowState::Finalize);
    }

    #[test]
    fn test_reject_without_feedback_uses_marker() {
        let mut conversation = paused_conversation();
        process_decision(&mut conversation, ReviewDecision::Reject { feedback: None }).unwrap();

        assert_eq!(conversation.context.critique_hints(), [REJECTION_MARKER.to_string()]);
        assert_eq!(conversation.context.iteration_count(), 1);
        assert!(conversation.context.is_feedback);
        assert_eq!(
            conversation.state,
            WorkflowState::Rejected { feedback: None }
        );
    }

    #[test]
    fn test_reject_with_feedback() {
        let mut conversation = paused_conversation();
        process_decision(
            &mut conversation,
            ReviewDecision::Reject {
                feedback: Some("use the EU store".to_string()),
            },
        )
        .unwrap();

        assert_eq!(conversation.context.user_text, "use the EU store");
        assert_eq!(
            conversation.specification().unwrap().critique_history().last().map(String::as_str),
            Some("Rejected by reviewer: use the EU store")
        );
    }

    #[test]
    fn test_decision_outside_review_is_mismatch() {
        let mut conversation = paused_conversation();
        conversation.state = WorkflowState::Approved;
        let before = conversation.clone();

        let err = process_decision(&mut conversation, ReviewDecision::Approve { notes: None })
            .unwrap_err();

        assert!(matches!(err, DomainError::StateMismatch { .. }));
        assert_eq!(conversation, before);
    }
}
