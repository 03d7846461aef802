//! Core data types shared across the aggregation engine.

mod criteria;
mod listing;
mod status;

pub use criteria::{CriteriaError, SearchCriteria};
pub use listing::{ContactInfo, DedupKey, Listing};
pub use status::{AggregateResult, ScraperStatus, SourceReport, SourceStatus};
