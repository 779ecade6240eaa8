//! URL reachability port.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::models::UrlHealth;

/// Reachability checker for target URLs.
///
/// Implementations never fail as a whole: a URL that cannot be checked is
/// reported as [`UrlHealth::Unhealthy`]. The returned map is keyed by the URL
/// exactly as supplied.
#[async_trait]
pub trait UrlProber: Send + Sync {
    /// Check every URL concurrently and report each one.
    async fn probe(&self, urls: &[String]) -> BTreeMap<String, UrlHealth>;
}
