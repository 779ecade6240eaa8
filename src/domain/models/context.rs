//! Per-conversation working memory.

use serde::{Deserialize, Serialize};

use super::specification::Specification;

/// Default number of validation rounds before a human is forced in.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Working memory carried across the turns of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    conversation_id: String,
    /// Current request or feedback text.
    pub user_text: String,
    /// Whether `user_text` is feedback on `last_spec`.
    pub is_feedback: bool,
    critique_hints: Vec<String>,
    last_spec: Option<Specification>,
    iteration_count: u32,
    max_iterations: u32,
    human_review_forced: bool,
}

impl ConversationContext {
    /// Fresh context. A zero budget is raised to one.
    pub fn new(conversation_id: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_text: String::new(),
            is_feedback: false,
            critique_hints: Vec::new(),
            last_spec: None,
            iteration_count: 0,
            max_iterations: max_iterations.max(1),
            human_review_forced: false,
        }
    }

    /// Id of the owning conversation.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Deduplicated hints from failed rounds, oldest first.
    pub fn critique_hints(&self) -> &[String] {
        &self.critique_hints
    }

    /// Most recent specification, if one was produced.
    pub const fn last_spec(&self) -> Option<&Specification> {
        self.last_spec.as_ref()
    }

    /// Validation rounds spent on the current request.
    pub const fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    /// Validation rounds allowed per request.
    pub const fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Set once the budget ran out on the current request.
    pub const fn human_review_forced(&self) -> bool {
        self.human_review_forced
    }

    /// True once the current request has used all its rounds.
    pub const fn budget_exhausted(&self) -> bool {
        self.iteration_count >= self.max_iterations
    }

    /// Take in a brand-new request. Hints, the last spec, the iteration
    /// budget and the forced flag belong to the previous request and are reset.
    pub fn begin_query(&mut self, text: impl Into<String>) {
        self.user_text = text.into();
        self.is_feedback = false;
        self.critique_hints.clear();
        self.last_spec = None;
        self.iteration_count = 0;
        self.human_review_forced = false;
    }

    /// Take in feedback on the current spec; everything else is kept.
    pub fn begin_feedback(&mut self, text: impl Into<String>) {
        self.user_text = text.into();
        self.is_feedback = true;
    }

    /// Add a hint unless an equal one (ignoring case) is already present.
    /// Returns whether the hint was stored.
    pub fn add_hint(&mut self, hint: &str) -> bool {
        let hint = hint.trim();
        if hint.is_empty()
            || self
                .critique_hints
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(hint))
        {
            return false;
        }
        self.critique_hints.push(hint.to_string());
        true
    }

    /// Replace the working specification.
    pub fn set_last_spec(&mut self, spec: Specification) {
        self.last_spec = Some(spec);
    }

    /// Mutable access to the stored spec, for status updates in place.
    pub fn last_spec_mut(&mut self) -> Option<&mut Specification> {
        self.last_spec.as_mut()
    }

    /// Count one more attempt. Returns the new count.
    pub fn record_iteration(&mut self) -> u32 {
        self.iteration_count = self.iteration_count.saturating_add(1);
        if self.budget_exhausted() {
            self.human_review_forced = true;
        }
        self.iteration_count
    }
}
