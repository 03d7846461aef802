//! Source config registry.
//!
//! Enumeration order is declaration order and is load-bearing: the
//! deduplicator prefers the first-seen source when two sources mirror the
//! same listing.

use std::path::Path;

use tracing::info;

use super::config::{
    ExtractionRules, PaginationConfig, RateLimitConfig, SourceConfig, SourceMode,
};

/// Immutable registry of configured listing sources.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceConfig>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self { sources }
    }

    /// The built-in source set.
    pub fn builtin() -> Self {
        Self::new(builtin_sources())
    }

    /// Load source descriptors from a JSON file (an array of SourceConfig).
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let sources: Vec<SourceConfig> = serde_json::from_str(&raw)?;
        info!("Loaded {} sources from {}", sources.len(), path.display());
        Ok(Self::new(sources))
    }

    /// All configured sources, in declaration order.
    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Enabled sources only, in declaration order.
    pub fn enabled(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Look up a source by name.
    pub fn get(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Built-in descriptors for the default German rental sites.
///
/// Selector sets here are data, not design: they track the sites' markup
/// and are expected to be overridden from a sources file in deployments.
fn builtin_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            name: "wohnungsboerse".to_string(),
            base_url: "https://www.wohnungsboerse.net".to_string(),
            search_url:
                "https://www.wohnungsboerse.net/searches/index?city={city}&minrent={min_price}&maxrent={max_price}&page={page}"
                    .to_string(),
            mode: SourceMode::Html,
            extract: ExtractionRules {
                listing: "div.search_result_entry".to_string(),
                id: Some("data-id".to_string()),
                title: Some("h3 a".to_string()),
                price: Some(".rent".to_string()),
                location: Some(".address".to_string()),
                rooms: Some(".rooms".to_string()),
                size: Some(".size".to_string()),
                image: Some("img".to_string()),
                link: Some("h3 a".to_string()),
                ..Default::default()
            },
            pagination: Some(PaginationConfig {
                next_selector: Some("a[rel=next]".to_string()),
                ..Default::default()
            }),
            rate_limit: RateLimitConfig {
                delay_ms: 800,
                max_requests: 15,
            },
            enabled: true,
            render: false,
            currency: "EUR".to_string(),
        },
        SourceConfig {
            name: "immo-api".to_string(),
            base_url: "https://api.immo.example".to_string(),
            search_url:
                "https://api.immo.example/v2/listings?location={city}&priceMax={max_price}&roomsMin={min_rooms}&page={page}"
                    .to_string(),
            mode: SourceMode::Json,
            extract: ExtractionRules {
                listing: String::new(),
                results_path: Some("results".to_string()),
                total_path: Some("totalCount".to_string()),
                id: Some("id".to_string()),
                title: Some("title".to_string()),
                price: Some("rent.total".to_string()),
                location: Some("address.full".to_string()),
                rooms: Some("rooms".to_string()),
                size: Some("livingSpace".to_string()),
                description: Some("teaser".to_string()),
                image: Some("titleImage".to_string()),
                link: Some("detailUrl".to_string()),
            },
            pagination: Some(PaginationConfig {
                next_selector: None,
                page_param: "page".to_string(),
                max_pages: 10,
            }),
            rate_limit: RateLimitConfig {
                delay_ms: 300,
                max_requests: 30,
            },
            enabled: true,
            render: false,
            currency: "EUR".to_string(),
        },
        SourceConfig {
            name: "stadtwohnen".to_string(),
            base_url: "https://www.stadtwohnen.example".to_string(),
            search_url: "https://www.stadtwohnen.example/mieten/{city}?page={page}".to_string(),
            mode: SourceMode::Html,
            extract: ExtractionRules {
                listing: "li.offer-item".to_string(),
                id: None,
                title: Some(".offer-title".to_string()),
                price: Some(".offer-price".to_string()),
                location: Some(".offer-location".to_string()),
                size: Some(".offer-area".to_string()),
                link: Some("a.offer-link".to_string()),
                ..Default::default()
            },
            pagination: Some(PaginationConfig {
                next_selector: Some("a.pagination-next".to_string()),
                max_pages: 3,
                ..Default::default()
            }),
            rate_limit: RateLimitConfig {
                delay_ms: 1000,
                max_requests: 8,
            },
            enabled: true,
            // Client-side rendered result grid.
            render: true,
            currency: "EUR".to_string(),
        },
    ]
}
