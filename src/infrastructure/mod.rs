//! Infrastructure layer: configuration, logging and retry plumbing.

pub mod config;
pub mod logging;
pub mod retry;

pub use config::{ConfigError, ConfigLoader};
pub use logging::{LogConfig, LoggerImpl};
pub use retry::RetryPolicy;
