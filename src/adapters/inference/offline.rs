//! Offline inference client.
//!
//! Keyword heuristics standing in for a language model, so the CLI and
//! demos work without network access or an API key. It answers the same
//! JSON shapes a model is asked for, reading the structured `inputs` of each
//! request rather than the rendered prompt.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::models::specification::urls_in_text;
use crate::domain::ports::{InferenceClient, InferenceError, InferenceRequest, PromptKind};

/// Field keywords: (field name, trigger words, description).
const FIELD_KEYWORDS: &[(&str, &[&str], &str)] = &[
    ("price", &["price", "cost"], "Listed price of the item"),
    ("title", &["title", "name"], "Title or name of the item"),
    ("description", &["description"], "Descriptive text of the item"),
    ("image", &["image", "photo", "picture"], "Main image URL"),
    ("rating", &["rating", "review"], "Average rating or review score"),
];

const JS_HEAVY_SITES: &[&str] = &["amazon", "ebay", "walmart", "etsy", "airbnb", "booking"];
const REMOVAL_WORDS: &[&str] = &["remove", "drop", "without", "don't need", "no longer"];

/// Heuristic, network-free inference client.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineInferenceClient;

impl OfflineInferenceClient {
    /// Create the heuristics client.
    pub const fn new() -> Self {
        Self
    }

    fn extract(inputs: &Value) -> Value {
        let query = inputs.get("query").and_then(Value::as_str).unwrap_or_default();
        let lowered = query.to_lowercase();
        let urls = urls_in_text(query);

        let mut fields: Vec<Value> = matched_fields(&lowered)
            .map(|(name, description)| json!({"name": name, "description": description}))
            .collect();
        if fields.is_empty() {
            fields.push(json!({"name": "title", "description": "Title or name of the item"}));
        }

        let mut requirements = vec!["html_parsing"];
        let js_heavy = lowered.contains("javascript")
            || urls.iter().any(|url| {
                let host = host_of(url);
                JS_HEAVY_SITES.iter().any(|site| host.contains(site))
            });
        if js_heavy {
            requirements.push("javascript_rendering");
        }

        json!({
            "target_urls": urls,
            "fields_to_extract": fields,
            "constraints": {},
            "technical_requirements": requirements,
        })
    }

    fn revise(inputs: &Value) -> Value {
        let feedback = inputs.get("feedback").and_then(Value::as_str).unwrap_or_default();
        let lowered = feedback.to_lowercase();
        let spec = inputs.get("specification").cloned().unwrap_or(Value::Null);
        let existing_fields: Vec<&str> = spec
            .get("fields_to_extract")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        let removing = REMOVAL_WORDS.iter().any(|w| lowered.contains(w));

        let mut changes = Vec::new();
        for url in urls_in_text(feedback) {
            let kind = if removing { "remove_url" } else { "add_url" };
            changes.push(json!({"type": kind, "url": url}));
        }
        for (name, description) in matched_fields(&lowered) {
            let present = existing_fields.contains(&name);
            if removing && present {
                changes.push(json!({"type": "remove_field", "field_name": name}));
            } else if !removing && !present {
                changes.push(json!({"type": "add_field", "field_name": name, "description": description}));
            }
        }
        if lowered.contains("javascript") {
            changes.push(json!({"type": "add_requirement", "requirement": "javascript_rendering"}));
        }

        let reasoning = if changes.is_empty() {
            "No actionable change recognised in the feedback".to_string()
        } else {
            format!("Applied {} change(s) derived from the feedback", changes.len())
        };
        json!({"changes": changes, "reasoning": reasoning})
    }

    fn judge(inputs: &Value) -> Value {
        let spec = inputs.get("specification").cloned().unwrap_or(Value::Null);
        let is_empty = |key: &str| {
            spec.get(key)
                .and_then(Value::as_array)
                .is_none_or(Vec::is_empty)
        };

        let mut issues = Vec::new();
        let mut questions = Vec::new();
        if is_empty("target_urls") {
            issues.push("No target website URL was specified".to_string());
            questions.push("Which website should be scraped?".to_string());
        }
        if is_empty("fields_to_extract") {
            issues.push("Fields to extract are missing".to_string());
            questions.push("Which data points do you need?".to_string());
        }

        json!({
            "is_valid": issues.is_empty(),
            "issues": issues,
            "needs_clarification": false,
            "clarification_questions": questions,
            "suggested_improvements": [],
        })
    }
}

fn matched_fields(lowered: &str) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
    FIELD_KEYWORDS
        .iter()
        .filter(move |(_, triggers, _)| triggers.iter().any(|t| lowered.contains(t)))
        .map(|(name, _, description)| (*name, *description))
}

fn host_of(url: &str) -> String {
    url.split("//")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

#[async_trait]
impl InferenceClient for OfflineInferenceClient {
    async fn invoke(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let reply = match request.kind {
            PromptKind::Extract => Self::extract(&request.inputs),
            PromptKind::Revise => Self::revise(&request.inputs),
            PromptKind::Judge => Self::judge(&request.inputs),
        };
        Ok(reply.to_string())
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}
