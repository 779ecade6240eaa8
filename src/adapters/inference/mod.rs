//! Inference collaborator adapters.

pub mod anthropic_api;
pub mod offline;
pub mod retrying;
pub mod scripted;

pub use anthropic_api::{AnthropicConfig, AnthropicInferenceClient};
pub use offline::OfflineInferenceClient;
pub use retrying::RetryingInferenceClient;
pub use scripted::ScriptedInferenceClient;
