//! The listing aggregation engine.
//!
//! One [`SourceAdapter`] exists per external listing site, driven by its
//! [`SourceConfig`]. The [`ScraperManager`] fans out across all enabled
//! sources, walking pages under per-source rate limits and timeouts, then
//! normalizes and deduplicates the results.

pub mod adapter;
pub mod config;
pub mod error;
pub mod http_client;
pub mod manager;
pub mod normalize;
pub mod pagination;
pub mod rate_limiter;
pub mod registry;
pub mod renderer;

pub use adapter::ConfigurableAdapter;
pub use config::{ExtractionRules, PaginationConfig, RateLimitConfig, SourceConfig, SourceMode};
pub use error::{AggregateError, ScrapeError};
pub use http_client::HttpClient;
pub use manager::{ManagerConfig, ScraperManager};
pub use rate_limiter::RunLimiter;
pub use registry::SourceRegistry;
pub use renderer::{DirectRenderer, PageRenderer, RelayRenderer};

use async_trait::async_trait;

use crate::models::SearchCriteria;

/// Source-specific extraction result for a single listing, before
/// normalization. Produced by an adapter, consumed immediately by the
/// normalizer, then discarded.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub source_local_id: Option<String>,
    pub title: Option<String>,
    pub price: Option<String>,
    pub location: Option<String>,
    pub rooms: Option<String>,
    pub size: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub link: Option<String>,
}

impl RawRecord {
    /// True when no extraction rule produced any value.
    pub fn is_empty(&self) -> bool {
        self.source_local_id.is_none()
            && self.title.is_none()
            && self.price.is_none()
            && self.location.is_none()
            && self.link.is_none()
    }
}

/// Position within a source's result pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageToken {
    /// 1-based page number, substituted into the search URL template.
    Number(u32),
    /// Explicit next-page URL taken from the previous page.
    Url(String),
}

impl PageToken {
    pub fn first() -> Self {
        PageToken::Number(1)
    }
}

/// One fetched page of raw records plus the "has more" signal.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub records: Vec<RawRecord>,
    pub has_more: bool,
    pub next_page: Option<PageToken>,
    /// Total result count reported by the source, if it exposes one.
    pub total_reported: Option<u64>,
}

impl Default for PageToken {
    fn default() -> Self {
        PageToken::first()
    }
}

/// Capability contract for one external listing source.
///
/// Adapters translate generic criteria into the source's protocol. Criteria
/// fields a source cannot represent are silently ignored; filtering is
/// best-effort narrowing, never strict.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique source name, matching the registry entry.
    fn name(&self) -> &str;

    /// Fetch one page of results for the criteria.
    async fn fetch_page(
        &self,
        criteria: &SearchCriteria,
        page: &PageToken,
    ) -> Result<FetchedPage, ScrapeError>;
}
