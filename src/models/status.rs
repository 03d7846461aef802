//! Per-source and aggregate run reporting types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Listing;

/// Outcome of walking a single source during one aggregation run.
#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    pub source: String,
    /// Count reported by the source itself, or the collected count.
    pub total_found: u64,
    /// True when more pages existed beyond the configured page cap.
    pub truncated: bool,
    pub next_page_url: Option<String>,
    /// Source-level errors (fetch, extraction, rate limit, timeout).
    pub errors: Vec<String>,
    /// Records excluded during normalization (unparsable price, no identity).
    pub dropped: u64,
}

/// Per-source status attached to an aggregate result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub source: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub listings: usize,
    pub duration_ms: u64,
}

/// Result of one aggregation run across all enabled sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub listings: Vec<Listing>,
    pub total_found: u64,
    pub sources: Vec<SourceStatus>,
    /// Flattened source-level errors, in registry order.
    pub errors: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl AggregateResult {
    /// Number of sources that completed without errors.
    pub fn succeeded(&self) -> usize {
        self.sources.iter().filter(|s| s.ok).count()
    }
}

/// Health entry for one configured scraper, derived from the registry plus
/// the most recent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperStatus {
    pub name: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
}
