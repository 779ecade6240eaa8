//! Critique accumulation between validation rounds.

use tracing::debug;

use crate::domain::models::{ConversationContext, ValidationResult};

/// Fold a failed validation into the conversation's hints and count the
/// attempt. Returns the new iteration count.
pub fn accumulate(context: &mut ConversationContext, result: &ValidationResult) -> u32 {
    let added = result
        .issues
        .iter()
        .filter(|issue| context.add_hint(issue))
        .count();
    let iteration = context.record_iteration();
    debug!(
        conversation_id = context.conversation_id(),
        added,
        iteration,
        max = context.max_iterations(),
        forced = context.human_review_forced(),
        "critique accumulated"
    );
    iteration
}
