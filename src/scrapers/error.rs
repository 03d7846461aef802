//! Error taxonomy for source scraping.
//!
//! Every variant here is a source-level failure: it terminates (or skips)
//! one source's walk and becomes a status entry on the aggregate result,
//! never a failure of the whole `search_all` call.

use thiserror::Error;

/// Errors raised while fetching or extracting from a single source.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network-level failure reaching the source or the render relay.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Non-success HTTP status from the source.
    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// Selector or structure mismatch: the source's markup changed.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The per-run request budget for this source is spent.
    #[error("rate limit exceeded after {max} requests")]
    RateLimitExceeded { max: u32 },

    /// Per-source wall-clock budget exceeded.
    #[error("timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The source's configuration is unusable (bad selector, bad template).
    #[error("invalid source config: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Fetch(err.to_string())
    }
}

/// Fatal errors for an aggregation run. Per-source failures never surface
/// here; only a run that cannot start at all does.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    InvalidCriteria(#[from] crate::models::CriteriaError),

    #[error("no enabled sources configured")]
    NoSources,
}
