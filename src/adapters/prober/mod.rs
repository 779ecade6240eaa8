//! URL health adapters.

pub mod fixed;
pub mod http;

pub use fixed::FixedUrlProber;
pub use http::HttpUrlProber;
