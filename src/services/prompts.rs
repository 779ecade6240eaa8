//! Prompt assembly for the inference collaborator.
//!
//! Each builder returns an [`InferenceRequest`] carrying both the rendered
//! prompt and the structured inputs it was rendered from. Input keys:
//!
//! | kind    | keys                                                        |
//! |---------|-------------------------------------------------------------|
//! | extract | `query`, `critique_hints`                                   |
//! | revise  | `feedback`, `original_query`, `specification`, `critique_hints` |
//! | judge   | `original_query`, `specification`, `url_health`             |

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::{json, Value};

use crate::domain::models::{Specification, UrlHealth};
use crate::domain::ports::{InferenceRequest, PromptKind};

const EXTRACT_SYSTEM: &str = "You convert natural-language web scraping requests into structured \
specifications. Extract exactly what the user asks for: target URLs or domains as written, the data \
fields to extract (each with a short description), and any constraints such as limits or time \
periods. Respond with a single JSON object with keys `target_urls` (array of strings), \
`fields_to_extract` (array of objects with `name` and `description`), `constraints` (object) and \
`technical_requirements` (array of capability tags such as `html_parsing` or \
`javascript_rendering`). No prose.";

const REVISE_SYSTEM: &str = "You update an existing web scraping specification from user feedback. \
Change only what the feedback asks for and never drop fields unless told to. Respond with a single \
JSON object with keys `changes` and `reasoning`. Each change is an object with a `type` of \
`add_url`/`remove_url` (`url`), `replace_urls` (`urls`), `add_field` (`field_name`, \
`description`), `remove_field` (`field_name`), `update_field` (`field_name`, optional \
`description`, optional `new_name`), `add_constraint` (`key`, `value`), `remove_constraint` \
(`key`) or `add_requirement` (`requirement`). No prose.";

const JUDGE_SYSTEM: &str = "You judge whether a web scraping specification faithfully captures the \
user's original request: the right target sites, every requested field and constraint, nothing \
extra, and nothing ambiguous. Respond with a single JSON object with keys `is_valid` (boolean), \
`issues` (array of strings), `needs_clarification` (boolean), `clarification_questions` (array of \
strings) and `suggested_improvements` (array of strings). No prose.";

fn render_hints(prompt: &mut String, hints: &[String]) {
    if hints.is_empty() {
        return;
    }
    prompt.push_str("\n\nA previous attempt had these issues; address them:\n");
    for hint in hints {
        let _ = writeln!(prompt, "- {hint}");
    }
}

fn spec_json(spec: &Specification) -> Value {
    serde_json::to_value(spec).unwrap_or(Value::Null)
}

/// Request for the first specification of a query.
pub fn extraction_request(query: &str, critique_hints: &[String]) -> InferenceRequest {
    let mut prompt = format!("Scraping request:\n{query}");
    render_hints(&mut prompt, critique_hints);

    InferenceRequest {
        kind: PromptKind::Extract,
        system: EXTRACT_SYSTEM.to_string(),
        prompt,
        inputs: json!({
            "query": query,
            "critique_hints": critique_hints,
        }),
    }
}

/// Request for diff ops that apply `feedback` to `spec`.
pub fn revision_request(
    feedback: &str,
    existing: &Specification,
    critique_hints: &[String],
) -> InferenceRequest {
    let spec = spec_json(existing);
    let mut prompt = format!(
        "Original request:\n{}\n\nCurrent specification:\n{}\n\nUser feedback:\n{feedback}",
        existing.original_query(),
        serde_json::to_string_pretty(&spec).unwrap_or_default(),
    );
    render_hints(&mut prompt, critique_hints);

    InferenceRequest {
        kind: PromptKind::Revise,
        system: REVISE_SYSTEM.to_string(),
        prompt,
        inputs: json!({
            "feedback": feedback,
            "original_query": existing.original_query(),
            "specification": spec,
            "critique_hints": critique_hints,
        }),
    }
}

/// Request for a verdict on `spec` given observed URL health.
pub fn judge_request(spec: &Specification, url_health: &BTreeMap<String, UrlHealth>) -> InferenceRequest {
    let spec_value = spec_json(spec);
    let mut prompt = format!(
        "Original request:\n{}\n\nSpecification:\n{}",
        spec.original_query(),
        serde_json::to_string_pretty(&spec_value).unwrap_or_default(),
    );
    if !url_health.is_empty() {
        prompt.push_str("\n\nURL health:\n");
        for (url, health) in url_health {
            let _ = writeln!(prompt, "- {url}: {health}");
        }
    }

    InferenceRequest {
        kind: PromptKind::Judge,
        system: JUDGE_SYSTEM.to_string(),
        prompt,
        inputs: json!({
            "original_query": spec.original_query(),
            "specification": spec_value,
            "url_health": url_health,
        }),
    }
}
