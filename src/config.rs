//! Runtime configuration, loaded from the environment.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::scrapers::{ManagerConfig, RateLimitConfig};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the API server.
    pub listen_addr: String,
    /// Wall-clock budget per source per aggregation run.
    pub per_source_timeout_secs: u64,
    /// Page cap for sources without their own pagination descriptor.
    pub max_pages_default: u32,
    /// HTTP timeout for individual outbound requests.
    pub request_timeout_secs: u64,
    /// Headless-browser rendering endpoint for JS-heavy sources.
    pub render_endpoint: Option<String>,
    /// Optional JSON file overriding the built-in source registry.
    pub sources_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            per_source_timeout_secs: 30,
            max_pages_default: 5,
            request_timeout_secs: 30,
            render_endpoint: None,
            sources_file: None,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            listen_addr: env::var("RENTSCOUT_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            per_source_timeout_secs: parse_var(
                "RENTSCOUT_SOURCE_TIMEOUT_SECS",
                defaults.per_source_timeout_secs,
            )?,
            max_pages_default: parse_var("RENTSCOUT_MAX_PAGES", defaults.max_pages_default)?,
            request_timeout_secs: parse_var(
                "RENTSCOUT_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            render_endpoint: env::var("RENTSCOUT_RENDER_ENDPOINT").ok(),
            sources_file: env::var("RENTSCOUT_SOURCES_FILE").ok().map(PathBuf::from),
        })
    }

    /// Orchestrator settings derived from this config.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            per_source_timeout: Duration::from_secs(self.per_source_timeout_secs),
            max_pages_default: self.max_pages_default,
            rate_limit_overrides: HashMap::<String, RateLimitConfig>::new(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => Ok(raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {name}: {e}"))?),
        Err(_) => Ok(default),
    }
}
