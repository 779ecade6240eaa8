//! Workflow driver.
//!
//! A single dispatch loop advances a [`Conversation`] one [`WorkflowState`]
//! at a time until it rests: paused for review, approved or abandoned.
//! Collaborator failures never escape a step; the only error is the step
//! guard tripping, which would mean a routing bug.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Conversation, ReviewKind, Specification, ValidationStatus, WorkflowState,
};
use crate::domain::ports::{InferenceClient, UrlProber};
use crate::services::critique;
use crate::services::extraction::ExtractionStep;
use crate::services::human_review::prepare_for_review;
use crate::services::revision::RevisionStep;
use crate::services::router::{initial_state, route_after_validation, state_for_route};
use crate::services::validation::ValidationStep;

/// States visited per validation round, with headroom.
const STEPS_PER_ROUND: u32 = 8;

/// Runs conversations through extraction, revision, validation and review
/// preparation. Stateless between calls; all progress lives on the
/// [`Conversation`].
pub struct WorkflowEngine {
    extraction: ExtractionStep,
    revision: RevisionStep,
    validation: ValidationStep,
}

impl WorkflowEngine {
    /// Build the engine. The same client serves extraction, revision and judging.
    pub fn new(client: Arc<dyn InferenceClient>, prober: Arc<dyn UrlProber>) -> Self {
        Self {
            extraction: ExtractionStep::new(client.clone()),
            revision: RevisionStep::new(client.clone()),
            validation: ValidationStep::new(client, prober),
        }
    }

    /// Drive `conversation` until it pauses or terminates.
    #[instrument(skip_all, fields(conversation_id = %conversation.id()))]
    pub async fn run(&self, conversation: &mut Conversation) -> DomainResult<()> {
        let max_steps = conversation
            .context
            .max_iterations()
            .saturating_add(2)
            .saturating_mul(STEPS_PER_ROUND);
        let mut steps = 0;

        while !conversation.state.is_resting() {
            if steps >= max_steps {
                warn!(steps, state = conversation.state.name(), "step guard tripped");
                return Err(DomainError::StepLimitExceeded(conversation.id().to_string()));
            }
            let from = conversation.state.name();
            let next = self.step(conversation).await;
            debug!(from, to = next.name(), "transition");
            conversation.state = next;
            conversation.touch();
            steps += 1;
        }

        info!(
            state = conversation.state.name(),
            iterations = conversation.context.iteration_count(),
            steps,
            "workflow resting"
        );
        Ok(())
    }

    async fn step(&self, conversation: &mut Conversation) -> WorkflowState {
        let state = std::mem::replace(&mut conversation.state, WorkflowState::Extract);
        match state {
            WorkflowState::Extract => self.extract(conversation).await,
            WorkflowState::Revise => self.revise(conversation).await,
            WorkflowState::Validate => self.validate(conversation).await,
            WorkflowState::Accumulate { result } => {
                critique::accumulate(&mut conversation.context, &result);
                initial_state(&conversation.context)
            }
            WorkflowState::PrepareReview {
                forced,
                unhealthy_urls,
            } => match conversation.context.last_spec_mut() {
                Some(spec) => WorkflowState::AwaitingReview {
                    kind: prepare_for_review(spec, forced, &unhealthy_urls),
                },
                None => WorkflowState::Extract,
            },
            WorkflowState::Rejected { .. } => WorkflowState::Revise,
            WorkflowState::Finalize => {
                if let Some(spec) = conversation.context.last_spec_mut() {
                    if spec.validation_status != ValidationStatus::UserApproved {
                        spec.set_status(ValidationStatus::UserApproved);
                    }
                }
                WorkflowState::Approved
            }
            resting @ (WorkflowState::AwaitingReview { .. }
            | WorkflowState::Approved
            | WorkflowState::Abandoned) => resting,
        }
    }

    async fn extract(&self, conversation: &mut Conversation) -> WorkflowState {
        let context = &mut conversation.context;
        let query = context.user_text.clone();

        if query.trim().is_empty() {
            context.set_last_spec(Specification::empty_input_fallback(query));
            return WorkflowState::AwaitingReview {
                kind: ReviewKind::Forced,
            };
        }

        let spec = self.extraction.extract(&query, context.critique_hints()).await;
        context.set_last_spec(spec);
        WorkflowState::Validate
    }

    async fn revise(&self, conversation: &mut Conversation) -> WorkflowState {
        let context = &mut conversation.context;
        let feedback = context.user_text.clone();

        let Some(existing) = context.last_spec().cloned() else {
            return WorkflowState::Extract;
        };

        if feedback.trim().is_empty() {
            let mut kept = existing;
            kept.push_critique("Empty feedback: nothing to revise");
            kept.needs_human_review = true;
            kept.set_status(ValidationStatus::NeedsHumanReview);
            context.set_last_spec(kept);
            return WorkflowState::AwaitingReview {
                kind: ReviewKind::Forced,
            };
        }

        let revised = self
            .revision
            .revise(&feedback, &existing, context.critique_hints())
            .await;
        context.set_last_spec(revised);
        WorkflowState::Validate
    }

    async fn validate(&self, conversation: &mut Conversation) -> WorkflowState {
        let Some(spec) = conversation.context.last_spec().cloned() else {
            return WorkflowState::Extract;
        };

        let (spec, result) = self.validation.validate(spec).await;
        let decision = route_after_validation(&result, &conversation.context, &spec);
        conversation.context.set_last_spec(spec);
        conversation.last_validation = Some(result.clone());
        state_for_route(decision, result)
    }
}
