//! Scripted inference client for tests.
//!
//! Each prompt kind has a queue of canned replies. When a queue runs dry the
//! kind's default reply is used, and without one the call fails with
//! [`InferenceError::EmptyResponse`]. Every call is counted and recorded.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{InferenceClient, InferenceError, InferenceRequest, PromptKind};

type Reply = Result<String, InferenceError>;

#[derive(Default)]
struct Script {
    queues: HashMap<PromptKind, VecDeque<Reply>>,
    defaults: HashMap<PromptKind, Reply>,
    calls: HashMap<PromptKind, usize>,
    requests: Vec<InferenceRequest>,
}

/// Inference client that replays queued replies.
#[derive(Default)]
pub struct ScriptedInferenceClient {
    script: Mutex<Script>,
}

impl ScriptedInferenceClient {
    /// Empty script. Unscripted calls get the per-kind default.
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a successful reply.
    pub fn push_text(&self, kind: PromptKind, text: impl Into<String>) {
        self.script().queues.entry(kind).or_default().push_back(Ok(text.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, kind: PromptKind, error: InferenceError) {
        self.script().queues.entry(kind).or_default().push_back(Err(error));
    }

    /// Reply used whenever the queue for `kind` is empty.
    pub fn set_default_text(&self, kind: PromptKind, text: impl Into<String>) {
        self.script().defaults.insert(kind, Ok(text.into()));
    }

    /// Fail every unscripted call of `kind` with `error`.
    pub fn set_default_error(&self, kind: PromptKind, error: InferenceError) {
        self.script().defaults.insert(kind, Err(error));
    }

    /// Number of calls made for `kind`.
    pub fn calls(&self, kind: PromptKind) -> usize {
        self.script().calls.get(&kind).copied().unwrap_or(0)
    }

    /// Calls across all kinds.
    pub fn total_calls(&self) -> usize {
        self.script().calls.values().sum()
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.script().requests.clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedInferenceClient {
    async fn invoke(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let mut script = self.script();
        *script.calls.entry(request.kind).or_insert(0) += 1;
        script.requests.push(request.clone());

        let queued = script.queues.get_mut(&request.kind).and_then(VecDeque::pop_front);
        queued
            .or_else(|| script.defaults.get(&request.kind).cloned())
            .unwrap_or(Err(InferenceError::EmptyResponse))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
