//! Parsing of free-form model output into typed payloads.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Why a reply could not be turned into the expected shape.
#[derive(Debug, Error)]
pub enum OutputParseError {
    #[error("model output contains no JSON object")]
    NoJson,

    #[error("model output is not valid for the expected schema: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Remove a surrounding Markdown code fence (```json or plain ```).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a JSON object out of model output.
///
/// Fences are stripped first; if the remainder still does not parse, the
/// slice between the first `{` and the last `}` is tried.
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T, OutputParseError> {
    let body = strip_code_fences(text);
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
                return Err(if body.contains('{') {
                    OutputParseError::Schema(first_err)
                } else {
                    OutputParseError::NoJson
                });
            };
            if end <= start {
                return Err(OutputParseError::NoJson);
            }
            Ok(serde_json::from_str(&body[start..=end])?)
        }
    }
}
