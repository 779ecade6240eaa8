//! Port trait definitions (Hexagonal Architecture)
//!
//! - InferenceClient: text completion for extraction, revision and judging
//! - UrlProber: target URL reachability
//! - ConversationStore: in-flight conversation records

pub mod conversation_store;
pub mod inference;
pub mod url_prober;

pub use conversation_store::ConversationStore;
pub use inference::{InferenceClient, InferenceError, InferenceRequest, PromptKind};
pub use url_prober::UrlProber;
