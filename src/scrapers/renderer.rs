//! Page fetching capability.
//!
//! Sources that serve plain HTML go through [`DirectRenderer`]. Sources
//! that need JavaScript execution are relayed through a headless-browser
//! rendering endpoint via [`RelayRenderer`]. Both sit behind the
//! [`PageRenderer`] trait so adapters (and tests) never hardwire the
//! transport.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::ScrapeError;
use super::http_client::HttpClient;

/// Capability to turn a URL into a response body.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Plain HTTP fetch, no rendering.
#[derive(Debug, Clone, Default)]
pub struct DirectRenderer {
    client: HttpClient,
}

impl DirectRenderer {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageRenderer for DirectRenderer {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        self.client.get_text(url).await
    }
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    html: String,
}

/// Relay through a headless-browser rendering service.
///
/// The relay call is itself retryable and timeout-bound: a transient relay
/// failure is retried with a short pause before the source is given up on.
#[derive(Debug, Clone)]
pub struct RelayRenderer {
    client: HttpClient,
    endpoint: String,
    attempts: u32,
    retry_pause: Duration,
}

impl RelayRenderer {
    pub fn new(client: HttpClient, endpoint: String) -> Self {
        Self {
            client,
            endpoint,
            attempts: 2,
            retry_pause: Duration::from_millis(500),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    async fn render_once(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self
            .client
            .inner()
            .post(&self.endpoint)
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let body: RenderResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::Fetch(format!("render relay returned bad JSON: {e}")))?;
        Ok(body.html)
    }
}

#[async_trait]
impl PageRenderer for RelayRenderer {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let mut last_err = None;
        for attempt in 1..=self.attempts {
            match self.render_once(url).await {
                Ok(html) => {
                    debug!("rendered {} via relay (attempt {})", url, attempt);
                    return Ok(html);
                }
                Err(e) => {
                    warn!("render relay attempt {} failed for {}: {}", attempt, url, e);
                    last_err = Some(e);
                    if attempt < self.attempts {
                        tokio::time::sleep(self.retry_pause).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ScrapeError::Fetch("render relay unavailable".into())))
    }
}
