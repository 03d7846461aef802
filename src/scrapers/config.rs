//! Per-source scraper configuration.
//!
//! These structs define the JSON-configurable behavior for each listing
//! source: where to search, how to extract fields, how to paginate, and how
//! hard the source may be hit. Loaded once at startup and never mutated.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a source's search response is parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Server-rendered HTML, extracted with CSS selectors.
    #[default]
    Html,
    /// JSON API, extracted with dot-notation paths.
    Json,
}

/// Static descriptor for one external listing source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique key for this source.
    pub name: String,
    pub base_url: String,
    /// Search URL template. Recognized placeholders: `{city}`, `{page}`,
    /// `{min_price}`, `{max_price}`, `{min_rooms}`, `{max_rooms}`,
    /// `{min_size}`, `{max_size}`. Query pairs whose placeholder has no
    /// value in the criteria are dropped from the final URL.
    pub search_url: String,
    #[serde(default)]
    pub mode: SourceMode,
    pub extract: ExtractionRules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationConfig>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Whether the source requires JavaScript execution; fetches are then
    /// relayed through the rendering endpoint.
    #[serde(default)]
    pub render: bool,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_enabled() -> bool {
    true
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// Field extraction rules, keyed by logical field name.
///
/// In HTML mode each value is a CSS selector relative to the listing
/// container (`link` and `image` read `href`/`src`); in JSON mode each value
/// is a dot-notation path relative to one result item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRules {
    /// Selector (or path) for one listing container. Matching zero
    /// containers on a well-formed response is an extraction error.
    pub listing: String,
    /// Where the source-local id lives: an attribute name on the container
    /// in HTML mode (e.g. `data-id`), a path in JSON mode. Optional;
    /// id-less sources fall back to content fingerprinting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rooms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// JSON mode only: path to the results array in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_path: Option<String>,
    /// JSON mode only: path to the total result count in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_path: Option<String>,
}

/// Pagination descriptor for a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// HTML mode: selector for the next-page link (reads `href`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_selector: Option<String>,
    /// Query parameter advanced numerically when no next link is configured.
    #[serde(default = "default_page_param")]
    pub page_param: String,
    /// Hard cap on pages fetched per run.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_max_pages() -> u32 {
    5
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            next_selector: None,
            page_param: default_page_param(),
            max_pages: default_max_pages(),
        }
    }
}

/// Request budget for one source within a single aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Minimum delay between consecutive requests to this source.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Maximum requests allowed in one run.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

fn default_delay_ms() -> u64 {
    500
}

fn default_max_requests() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            max_requests: default_max_requests(),
        }
    }
}

impl RateLimitConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl SourceConfig {
    /// Effective page cap for this source, falling back to a global default.
    pub fn max_pages_or(&self, default: u32) -> u32 {
        self.pagination
            .as_ref()
            .map(|p| p.max_pages)
            .unwrap_or(default)
    }
}
