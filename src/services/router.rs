//! Decision router. Pure functions over the conversation's data.

use crate::domain::models::{
    ConversationContext, ReviewDecision, RouteDecision, Specification, ValidationResult,
    WorkflowState,
};

/// Where a turn starts: feedback on an existing spec revises it,
/// anything else extracts from scratch.
pub const fn initial_state(context: &ConversationContext) -> WorkflowState {
    if context.is_feedback && context.last_spec().is_some() {
        WorkflowState::Revise
    } else {
        WorkflowState::Extract
    }
}

/// Route after a validation round.
///
/// Valid specs go to review. Invalid ones are retried while the iteration
/// budget lasts, then forced into review.
pub fn route_after_validation(
    result: &ValidationResult,
    context: &ConversationContext,
    spec: &Specification,
) -> RouteDecision {
    let unhealthy_urls = spec.unhealthy_urls();
    if result.is_valid {
        return RouteDecision::HumanReview {
            forced: false,
            unhealthy_urls,
        };
    }
    if context.human_review_forced() || context.budget_exhausted() {
        RouteDecision::HumanReview {
            forced: true,
            unhealthy_urls,
        }
    } else {
        RouteDecision::Retry
    }
}

/// Map a router decision onto the next workflow state.
pub fn state_for_route(decision: RouteDecision, result: ValidationResult) -> WorkflowState {
    match decision {
        RouteDecision::HumanReview {
            forced,
            unhealthy_urls,
        } => WorkflowState::PrepareReview {
            forced,
            unhealthy_urls,
        },
        RouteDecision::Retry => WorkflowState::Accumulate { result },
    }
}

/// Route after the reviewer decides.
pub fn route_after_review(decision: &ReviewDecision) -> WorkflowState {
    match decision {
        ReviewDecision::Approve { .. } => WorkflowState::Finalize,
        ReviewDecision::Reject { feedback } => WorkflowState::Rejected {
            feedback: feedback.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{UrlHealth, ValidationStatus};
    use std::collections::BTreeMap;

    fn invalid() -> ValidationResult {
        ValidationResult::rejected(vec!["missing price".to_string()], Vec::new(), false)
    }

    fn spec() -> Specification {
        let mut spec = Specification::create_new(
            "q",
            vec!["https://a.com".to_string(), "https://b.com".to_string()],
            Vec::new(),
            BTreeMap::new(),
        );
        spec.url_health_status
            .insert("https://b.com".to_string(), UrlHealth::Unhealthy);
        spec
    }

    #[test]
    fn test_initial_state() {
        let mut ctx = ConversationContext::new("c1", 5);
        ctx.begin_feedback("add rating");
        assert_eq!(initial_state(&ctx), WorkflowState::Extract);
        ctx.set_last_spec(spec());
        assert_eq!(initial_state(&ctx), WorkflowState::Revise);
        ctx.begin_query("new thing");
        assert_eq!(initial_state(&ctx), WorkflowState::Extract);
    }

    #[test]
    fn test_valid_goes_to_review_with_unhealthy_urls() {
        let ctx = ConversationContext::new("c1", 5);
        let decision = route_after_validation(&ValidationResult::valid(), &ctx, &spec());
        assert_eq!(
            decision,
            RouteDecision::HumanReview {
                forced: false,
                unhealthy_urls: vec!["https://b.com".to_string()]
            }
        );
    }

    #[test]
    fn test_invalid_retries_until_budget_spent() {
        let mut ctx = ConversationContext::new("c1", 5);
        for _ in 0..5 {
            assert_eq!(route_after_validation(&invalid(), &ctx, &spec()), RouteDecision::Retry);
            ctx.record_iteration();
        }
        assert!(matches!(
            route_after_validation(&invalid(), &ctx, &spec()),
            RouteDecision::HumanReview { forced: true, .. }
        ));
    }

    #[test]
    fn test_review_routes() {
        assert_eq!(
            route_after_review(&ReviewDecision::Approve { notes: None }),
            WorkflowState::Finalize
        );
        assert_eq!(
            route_after_review(&ReviewDecision::Reject {
                feedback: Some("wrong site".to_string())
            }),
            WorkflowState::Rejected {
                feedback: Some("wrong site".to_string())
            }
        );
    }

    #[test]
    fn test_state_for_retry_carries_result() {
        let result = invalid();
        assert_eq!(result.status, ValidationStatus::MissingData);
        let state = state_for_route(RouteDecision::Retry, result.clone());
        assert_eq!(state, WorkflowState::Accumulate { result });
    }
}
