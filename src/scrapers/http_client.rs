//! HTTP client shared by source adapters.

use std::time::Duration;

use reqwest::Client;

use super::error::ScrapeError;

const USER_AGENT: &str = concat!("rentscout/", env!("CARGO_PKG_VERSION"));

/// Thin wrapper over reqwest with the client options every source needs.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }

    /// GET a page as text, treating non-success statuses as errors.
    pub async fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    pub(crate) fn inner(&self) -> &Client {
        &self.client
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}
