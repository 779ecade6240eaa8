//! HTTP URL health prober.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, Method, Url};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::domain::models::{ProberConfig, UrlHealth};
use crate::domain::ports::UrlProber;

/// Probes URLs with `HEAD`, falling back to `GET` when the server refuses
/// or errors on `HEAD`. Anything below 400 after redirects counts as healthy.
pub struct HttpUrlProber {
    client: Client,
    timeout: Duration,
    limiter: Arc<Semaphore>,
}

impl HttpUrlProber {
    /// Build the client from health check settings. A zero concurrency cap is raised to one.
    pub fn new(config: &ProberConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            timeout,
            limiter: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
        })
    }

    async fn check(&self, raw: &str) -> UrlHealth {
        let Some(url) = normalize_url(raw) else {
            debug!(url = raw, "unparseable url");
            return UrlHealth::Unhealthy;
        };

        // The deadline covers the wait for a slot too, so a full batch
        // finishes within one timeout whatever the concurrency cap.
        let attempt = async {
            let _permit = self.limiter.acquire().await.ok()?;
            Some(self.head_then_get(url).await)
        };

        match timeout(self.timeout, attempt).await {
            Ok(Some(health)) => health,
            Ok(None) => UrlHealth::Unknown,
            Err(_) => {
                debug!(url = raw, "health check timed out");
                UrlHealth::Unhealthy
            }
        }
    }

    async fn head_then_get(&self, url: Url) -> UrlHealth {
        if self.request_ok(Method::HEAD, url.clone()).await {
            return UrlHealth::Healthy;
        }
        if self.request_ok(Method::GET, url).await {
            UrlHealth::Healthy
        } else {
            UrlHealth::Unhealthy
        }
    }

    async fn request_ok(&self, method: Method, url: Url) -> bool {
        match self.client.request(method.clone(), url.clone()).send().await {
            Ok(response) => {
                let status = response.status();
                debug!(%method, %url, status = status.as_u16(), "health check response");
                status.as_u16() < 400
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "health check request failed");
                false
            }
        }
    }
}

/// Add `https://` when the scheme is missing and parse.
pub fn normalize_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    Url::parse(&candidate)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
}

#[async_trait]
impl UrlProber for HttpUrlProber {
    #[instrument(skip(self, urls), fields(count = urls.len()))]
    async fn probe(&self, urls: &[String]) -> BTreeMap<String, UrlHealth> {
        if urls.is_empty() {
            return BTreeMap::new();
        }

        let checks = urls.iter().map(|url| async move { (url.clone(), self.check(url).await) });
        let results: BTreeMap<String, UrlHealth> = join_all(checks).await.into_iter().collect();

        let unhealthy = results.values().filter(|h| **h == UrlHealth::Unhealthy).count();
        if unhealthy > 0 {
            warn!(unhealthy, total = results.len(), "some target urls are unreachable");
        }
        results
    }
}
