//! Extraction step: free text to a fresh specification.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::domain::models::{FieldToExtract, Specification};
use crate::domain::ports::InferenceClient;
use crate::services::llm_output::parse_json_object;
use crate::services::prompts;

#[derive(Debug, Deserialize)]
struct ExtractionOutput {
    #[serde(default, alias = "target_urls_or_sites")]
    target_urls: Option<Vec<String>>,
    #[serde(default, alias = "data_to_extract")]
    fields_to_extract: Option<Vec<RawField>>,
    #[serde(default)]
    constraints: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    technical_requirements: Option<Vec<String>>,
}

/// Models return fields either as bare names or as objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawField {
    Name(String),
    Detailed {
        #[serde(alias = "field_name")]
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl From<RawField> for FieldToExtract {
    fn from(raw: RawField) -> Self {
        match raw {
            RawField::Name(name) => Self::new(name),
            RawField::Detailed { name, description } => Self {
                name,
                description,
            },
        }
    }
}

/// Builds specifications from scratch.
pub struct ExtractionStep {
    client: Arc<dyn InferenceClient>,
}

impl ExtractionStep {
    /// Extraction step backed by `client`.
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Extract a specification from `query`.
    ///
    /// Never fails: a blank query yields the empty-input fallback without
    /// calling the collaborator, and any collaborator or parse failure
    /// yields a degraded spec with `error` status.
    #[instrument(skip(self, query, critique_hints), fields(hints = critique_hints.len()))]
    pub async fn extract(&self, query: &str, critique_hints: &[String]) -> Specification {
        if query.trim().is_empty() {
            warn!("blank request, skipping extraction");
            return Specification::empty_input_fallback(query);
        }

        let request = prompts::extraction_request(query, critique_hints);
        let text = match self.client.invoke(&request).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, client = self.client.name(), "extraction call failed");
                return Specification::fallback(query, format!("Extraction failed: {err}"));
            }
        };

        let output: ExtractionOutput = match parse_json_object(&text) {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "extraction output unusable");
                return Specification::fallback(
                    query,
                    format!("Extraction failed: could not parse model output ({err})"),
                );
            }
        };

        let fields = output
            .fields_to_extract
            .unwrap_or_default()
            .into_iter()
            .map(FieldToExtract::from);
        let spec = Specification::create_new(
            query,
            output.target_urls.unwrap_or_default(),
            fields,
            output.constraints.unwrap_or_default(),
        )
        .with_requirements(output.technical_requirements.unwrap_or_default());

        info!(
            spec_id = spec.spec_id(),
            urls = spec.target_urls().len(),
            fields = spec.fields_to_extract().len(),
            "specification extracted"
        );
        spec
    }
}
