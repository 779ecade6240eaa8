//! Validation step: URL health plus an automated judge.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::domain::models::{Specification, UrlHealth, ValidationResult};
use crate::domain::ports::{InferenceClient, UrlProber};
use crate::services::llm_output::parse_json_object;
use crate::services::prompts;

#[derive(Debug, Deserialize)]
struct JudgeVerdict {
    #[serde(default)]
    is_valid: bool,
    #[serde(default)]
    issues: Option<Vec<String>>,
    #[serde(default, alias = "clarification_needed")]
    needs_clarification: Option<bool>,
    #[serde(default)]
    clarification_questions: Option<Vec<String>>,
    #[serde(default)]
    suggested_improvements: Option<Vec<String>>,
}

impl JudgeVerdict {
    fn into_result(self) -> ValidationResult {
        let questions = self.clarification_questions.unwrap_or_default();
        if self.is_valid {
            return ValidationResult {
                clarification_questions: questions,
                ..ValidationResult::valid()
            };
        }

        let mut issues = self.issues.unwrap_or_default();
        if issues.is_empty() {
            issues.extend(self.suggested_improvements.unwrap_or_default());
        }
        if issues.is_empty() {
            issues.push("Specification rejected by judge without detail".to_string());
        }
        ValidationResult::rejected(issues, questions, self.needs_clarification.unwrap_or(false))
    }
}

/// Checks a specification's URLs and asks the judge about the rest.
pub struct ValidationStep {
    client: Arc<dyn InferenceClient>,
    prober: Arc<dyn UrlProber>,
}

impl ValidationStep {
    /// Validation step using `client` as judge and `prober` for URL health.
    pub fn new(client: Arc<dyn InferenceClient>, prober: Arc<dyn UrlProber>) -> Self {
        Self { client, prober }
    }

    /// Validate `spec`, returning the updated spec and the verdict.
    ///
    /// When every target URL is unreachable the judge is not consulted.
    /// Judge failures turn into an `invalid` result; this never errors.
    #[instrument(skip_all, fields(spec_id = spec.spec_id()))]
    pub async fn validate(&self, mut spec: Specification) -> (Specification, ValidationResult) {
        spec.url_health_status = self.prober.probe(spec.target_urls()).await;

        let unhealthy = spec.unhealthy_urls();
        let all_unhealthy = !spec.target_urls().is_empty()
            && spec
                .target_urls()
                .iter()
                .all(|url| spec.url_health_status.get(url) == Some(&UrlHealth::Unhealthy));

        let result = if all_unhealthy {
            warn!(urls = ?unhealthy, "all target urls unreachable, skipping judge");
            ValidationResult::unreachable(&unhealthy)
        } else {
            self.judge(&spec).await
        };

        spec.set_status(result.status);
        for issue in &result.issues {
            spec.push_critique(issue.clone());
        }
        spec.clarification_questions.clone_from(&result.clarification_questions);

        info!(
            status = %result.status,
            issues = result.issues.len(),
            unhealthy = unhealthy.len(),
            "validation finished"
        );
        (spec, result)
    }

    async fn judge(&self, spec: &Specification) -> ValidationResult {
        let request = prompts::judge_request(spec, &spec.url_health_status);
        let text = match self.client.invoke(&request).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "judge call failed");
                return ValidationResult::judge_failure(err);
            }
        };
        match parse_json_object::<JudgeVerdict>(&text) {
            Ok(verdict) => verdict.into_result(),
            Err(err) => {
                warn!(error = %err, "judge output unusable");
                ValidationResult::judge_failure(err)
            }
        }
    }
}
