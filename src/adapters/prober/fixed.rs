//! URL health checker with canned answers.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::models::UrlHealth;
use crate::domain::ports::UrlProber;

/// Prober with predetermined answers, for tests and offline runs.
///
/// URLs without an explicit entry get the fallback health.
pub struct FixedUrlProber {
    overrides: HashMap<String, UrlHealth>,
    fallback: UrlHealth,
    probes: AtomicUsize,
}

impl FixedUrlProber {
    /// URLs without an override report `fallback`.
    pub fn new(fallback: UrlHealth) -> Self {
        Self {
            overrides: HashMap::new(),
            fallback,
            probes: AtomicUsize::new(0),
        }
    }

    /// Every URL is healthy.
    pub fn all_healthy() -> Self {
        Self::new(UrlHealth::Healthy)
    }

    /// Every URL is unhealthy.
    pub fn all_unhealthy() -> Self {
        Self::new(UrlHealth::Unhealthy)
    }

    /// Override the answer for one URL.
    #[must_use]
    pub fn with(mut self, url: impl Into<String>, health: UrlHealth) -> Self {
        self.overrides.insert(url.into(), health);
        self
    }

    /// Number of `probe` calls so far.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlProber for FixedUrlProber {
    async fn probe(&self, urls: &[String]) -> BTreeMap<String, UrlHealth> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        urls.iter()
            .map(|url| {
                let health = self.overrides.get(url).copied().unwrap_or(self.fallback);
                (url.clone(), health)
            })
            .collect()
    }
}
