//! Anthropic Messages API inference client.
//!
//! One non-streaming `POST /v1/messages` per prompt; text blocks of the reply
//! are concatenated and returned as-is. Parsing the text is the caller's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::models::InferenceConfig;
use crate::domain::ports::{InferenceClient, InferenceError, InferenceRequest};

const API_VERSION: &str = "2023-06-01";

/// Connection settings for the Anthropic client.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// Sent as `x-api-key`.
    pub api_key: String,
    /// API root, without the `/v1/messages` path.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Upper bound on reply length.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl AnthropicConfig {
    /// Build from the `inference` config section. `None` without an API key.
    pub fn from_settings(settings: &InferenceConfig) -> Option<Self> {
        let api_key = settings.resolved_api_key()?;
        Some(Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout_secs: settings.timeout_secs,
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

/// Inference client backed by the Anthropic Messages API.
pub struct AnthropicInferenceClient {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicInferenceClient {
    /// Build the HTTP client. Fails only if TLS setup fails.
    pub fn new(config: AnthropicConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InferenceError::InvalidRequest(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }
}

fn map_transport_error(err: &reqwest::Error) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Network(err.to_string())
    }
}

#[async_trait]
impl InferenceClient for AnthropicInferenceClient {
    async fn invoke(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: Some(request.system.as_str()).filter(|s| !s.is_empty()),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::from_status(status.as_u16(), body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Network(format!("Failed to parse response: {e}")))?;

        let text = parsed
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            kind = %request.kind,
            stop_reason = parsed.stop_reason.as_deref().unwrap_or("unknown"),
            chars = text.len(),
            "anthropic completion received"
        );

        if text.trim().is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
