//! rentscout - multi-source rental listing aggregation engine.
//!
//! Queries heterogeneous external listing sources concurrently under
//! per-source rate limits and timeouts, normalizes their results into one
//! canonical schema, deduplicates across sources, and reports partial
//! failures per source instead of failing the run.

pub mod config;
pub mod models;
pub mod scrapers;
pub mod server;

pub use config::Config;
pub use models::{AggregateResult, Listing, SearchCriteria};
pub use scrapers::{ScraperManager, SourceRegistry};
