//! Revision step: user feedback applied to an existing specification.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::domain::models::{DiffOp, Specification};
use crate::domain::ports::InferenceClient;
use crate::services::llm_output::parse_json_object;
use crate::services::prompts;

#[derive(Debug, Deserialize)]
struct RevisionOutput {
    #[serde(default, alias = "changes_to_make")]
    changes: Option<Vec<Value>>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    requirements_to_add: Option<Vec<String>>,
}

impl RevisionOutput {
    fn into_ops(self) -> (Vec<DiffOp>, Option<String>) {
        let mut ops = DiffOp::parse_lenient(&self.changes.unwrap_or_default());
        ops.extend(
            self.requirements_to_add
                .unwrap_or_default()
                .into_iter()
                .map(|requirement| DiffOp::AddRequirement { requirement }),
        );
        let reasoning = self.reasoning.filter(|r| !r.trim().is_empty());
        (ops, reasoning)
    }
}

/// Turns feedback into diff ops and applies them.
pub struct RevisionStep {
    client: Arc<dyn InferenceClient>,
}

impl RevisionStep {
    /// Revision step backed by `client`.
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Produce the next revision of `existing`.
    ///
    /// On collaborator or parse failure the existing spec comes back with
    /// the same id and status plus a critique entry describing the failure.
    #[instrument(skip_all, fields(spec_id = existing.spec_id()))]
    pub async fn revise(
        &self,
        feedback: &str,
        existing: &Specification,
        critique_hints: &[String],
    ) -> Specification {
        let request = prompts::revision_request(feedback, existing, critique_hints);

        let parsed = match self.client.invoke(&request).await {
            Ok(text) => parse_json_object::<RevisionOutput>(&text).map_err(|e| e.to_string()),
            Err(err) => Err(err.to_string()),
        };

        let output = match parsed {
            Ok(output) => output,
            Err(reason) => {
                warn!(error = %reason, "revision failed, keeping current specification");
                let mut unchanged = existing.clone();
                unchanged.push_critique(format!("Revision failed: {reason}"));
                return unchanged;
            }
        };

        let (ops, reasoning) = output.into_ops();
        let mut revised = existing.revise_with(&ops);
        revised.push_critique(format!("User feedback: {}", feedback.trim()));
        if let Some(reasoning) = reasoning {
            revised.push_critique(format!("Feedback applied: {reasoning}"));
        }

        info!(
            from = existing.spec_id(),
            to = revised.spec_id(),
            ops = ops.len(),
            "specification revised"
        );
        revised
    }
}
