//! Aggregation orchestrator.
//!
//! Fans out one pagination walk per enabled source, each as an independent
//! tokio task under its own wall-clock timeout, then merges the normalized
//! results through the global deduplicator. One source failing, timing out
//! or rate-limiting itself never affects a sibling source or the overall
//! call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::config::{RateLimitConfig, SourceConfig};
use super::error::{AggregateError, ScrapeError};
use super::normalize::{normalize, Deduplicator};
use super::pagination::{PageWalker, Terminal, WalkOutcome};
use super::rate_limiter::RunLimiter;
use super::registry::SourceRegistry;
use super::renderer::PageRenderer;
use super::{ConfigurableAdapter, RawRecord, SourceAdapter};
use crate::models::{AggregateResult, ScraperStatus, SearchCriteria, SourceReport, SourceStatus};

/// Orchestrator configuration, threaded in at construction.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Wall-clock budget per source per run.
    pub per_source_timeout: Duration,
    /// Page cap for sources without their own pagination descriptor.
    pub max_pages_default: u32,
    /// Per-source rate limit overrides, keyed by source name.
    pub rate_limit_overrides: HashMap<String, RateLimitConfig>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            per_source_timeout: Duration::from_secs(30),
            max_pages_default: 5,
            rate_limit_overrides: HashMap::new(),
        }
    }
}

/// One runnable source: its adapter plus the resolved config.
struct SourceEntry {
    adapter: Arc<dyn SourceAdapter>,
    config: SourceConfig,
    rate_limit: RateLimitConfig,
    max_pages: u32,
}

#[derive(Debug, Clone)]
struct LastRun {
    error: Option<String>,
    at: DateTime<Utc>,
}

/// The aggregation engine's entire inbound surface: `search_all` plus
/// `scrapers_status`.
pub struct ScraperManager {
    entries: Vec<SourceEntry>,
    /// All registry entries including disabled ones, for status reporting.
    configured: Vec<(String, bool)>,
    config: ManagerConfig,
    last_run: RwLock<HashMap<String, LastRun>>,
}

impl ScraperManager {
    /// Build a manager from a registry, wiring each enabled source to a
    /// configurable adapter. Sources marked `render` go through `relay`
    /// when one is configured and fall back to the direct renderer
    /// otherwise.
    pub fn new(
        registry: &SourceRegistry,
        config: ManagerConfig,
        direct: Arc<dyn PageRenderer>,
        relay: Option<Arc<dyn PageRenderer>>,
    ) -> Self {
        let mut entries = Vec::new();
        for source in registry.enabled() {
            let renderer = if source.render {
                match &relay {
                    Some(relay) => relay.clone(),
                    None => {
                        warn!(
                            "source {} wants rendering but no relay is configured, using direct fetch",
                            source.name
                        );
                        direct.clone()
                    }
                }
            } else {
                direct.clone()
            };
            let adapter: Arc<dyn SourceAdapter> =
                Arc::new(ConfigurableAdapter::new(source.clone(), renderer));
            entries.push(Self::entry(adapter, source.clone(), &config));
        }

        let configured = registry
            .sources()
            .iter()
            .map(|s| (s.name.clone(), s.enabled))
            .collect();

        Self {
            entries,
            configured,
            config,
            last_run: RwLock::new(HashMap::new()),
        }
    }

    /// Build a manager over explicit adapters. Adapters without a registry
    /// entry run with default source settings; used by tests and embedders
    /// that bring their own adapter implementations.
    pub fn with_adapters(adapters: Vec<Arc<dyn SourceAdapter>>, config: ManagerConfig) -> Self {
        let entries: Vec<SourceEntry> = adapters
            .into_iter()
            .map(|adapter| {
                let source = SourceConfig {
                    name: adapter.name().to_string(),
                    currency: "EUR".to_string(),
                    enabled: true,
                    ..Default::default()
                };
                Self::entry(adapter, source, &config)
            })
            .collect();
        let configured = entries
            .iter()
            .map(|e| (e.config.name.clone(), true))
            .collect();
        Self {
            entries,
            configured,
            config,
            last_run: RwLock::new(HashMap::new()),
        }
    }

    fn entry(
        adapter: Arc<dyn SourceAdapter>,
        config: SourceConfig,
        manager_config: &ManagerConfig,
    ) -> SourceEntry {
        let rate_limit = manager_config
            .rate_limit_overrides
            .get(&config.name)
            .cloned()
            .unwrap_or_else(|| config.rate_limit.clone());
        let max_pages = config.max_pages_or(manager_config.max_pages_default);
        SourceEntry {
            adapter,
            config,
            rate_limit,
            max_pages,
        }
    }

    /// Names of the sources this manager will query.
    pub fn source_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.config.name.clone())
            .collect()
    }

    /// Query every enabled source and merge the results.
    ///
    /// Only invalid criteria or an empty source set are fatal; every
    /// per-source failure is downgraded to a status entry, so a run where
    /// all sources fail still returns `Ok` with empty listings and one
    /// error per source.
    pub async fn search_all(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<AggregateResult, AggregateError> {
        criteria.validate()?;
        if self.entries.is_empty() {
            return Err(AggregateError::NoSources);
        }

        info!(
            "searching {} sources for city={:?}",
            self.entries.len(),
            criteria.city
        );

        // Fan out: one task per source, each with a fresh per-run limiter
        // and an unbounded channel so partial pages survive a timeout.
        let mut receivers = Vec::with_capacity(self.entries.len());
        let mut handles = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Vec<RawRecord>>();
            let walker = PageWalker::new(
                entry.adapter.clone(),
                RunLimiter::new(entry.rate_limit.clone()),
                entry.max_pages,
            );
            let criteria = criteria.clone();
            let budget = self.config.per_source_timeout;
            let source = entry.config.name.clone();

            let handle = tokio::spawn(async move {
                let started = Instant::now();
                let outcome = match tokio::time::timeout(budget, walker.walk(&criteria, tx)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!("{}: walk timed out after {:?}", source, budget);
                        WalkOutcome {
                            pages_fetched: 0,
                            total_found: 0,
                            truncated: false,
                            next_page_url: None,
                            terminal: Terminal::Failed(
                                ScrapeError::Timeout {
                                    ms: budget.as_millis() as u64,
                                }
                                .to_string(),
                            ),
                        }
                    }
                };
                (outcome, started.elapsed())
            });
            receivers.push(rx);
            handles.push(handle);
        }

        let settled = futures::future::join_all(handles).await;

        // Join step: single-threaded merge in registry order, so the
        // first-seen source wins ties in the deduplicator.
        let mut dedup = Deduplicator::new();
        let mut listings = Vec::new();
        let mut statuses = Vec::with_capacity(self.entries.len());
        let mut errors = Vec::new();

        for ((entry, mut rx), joined) in self.entries.iter().zip(receivers).zip(settled) {
            let (outcome, duration) = match joined {
                Ok(result) => result,
                Err(e) => (
                    WalkOutcome {
                        pages_fetched: 0,
                        total_found: 0,
                        truncated: false,
                        next_page_url: None,
                        terminal: Terminal::Failed(format!("walk task panicked: {e}")),
                    },
                    Duration::ZERO,
                ),
            };

            let mut raw = Vec::new();
            while let Ok(batch) = rx.try_recv() {
                raw.extend(batch);
            }

            let mut report = SourceReport {
                source: entry.config.name.clone(),
                total_found: outcome.total_found.max(raw.len() as u64),
                truncated: outcome.truncated,
                next_page_url: outcome.next_page_url,
                ..Default::default()
            };
            if let Terminal::Failed(message) = &outcome.terminal {
                report
                    .errors
                    .push(format!("{}: {}", entry.config.name, message));
            }

            let mut kept = 0usize;
            for record in &raw {
                let Some(listing) = normalize(record, &entry.config, criteria) else {
                    report.dropped += 1;
                    continue;
                };
                if !passes_criteria(&listing, criteria) {
                    continue;
                }
                if !dedup.insert(&listing) {
                    continue;
                }
                kept += 1;
                listings.push(listing);
            }
            debug!(
                "{}: {} raw, {} kept, {} dropped, {} pages",
                entry.config.name,
                raw.len(),
                kept,
                report.dropped,
                outcome.pages_fetched
            );

            let ok = report.errors.is_empty();
            statuses.push(SourceStatus {
                source: entry.config.name.clone(),
                ok,
                message: report.errors.first().cloned(),
                listings: kept,
                duration_ms: duration.as_millis() as u64,
            });
            errors.extend(report.errors.iter().cloned());
            if report.truncated {
                debug!(
                    "{}: more pages existed beyond the cap (next: {:?})",
                    report.source, report.next_page_url
                );
            }
        }

        // Remember per-source outcomes for health reporting.
        {
            let now = Utc::now();
            let mut last_run = self.last_run.write().await;
            for status in &statuses {
                last_run.insert(
                    status.source.clone(),
                    LastRun {
                        error: status.message.clone(),
                        at: now,
                    },
                );
            }
        }

        let total_found = listings.len() as u64;
        info!(
            "aggregation complete: {} listings from {}/{} sources",
            total_found,
            statuses.iter().filter(|s| s.ok).count(),
            statuses.len()
        );

        Ok(AggregateResult {
            listings,
            total_found,
            sources: statuses,
            errors,
            fetched_at: Utc::now(),
        })
    }

    /// Health view over all configured scrapers: registry state plus the
    /// most recent run's outcome. Process-local; resets on restart.
    pub async fn scrapers_status(&self) -> Vec<ScraperStatus> {
        let last_run = self.last_run.read().await;
        self.configured
            .iter()
            .map(|(name, enabled)| {
                let run = last_run.get(name);
                ScraperStatus {
                    name: name.clone(),
                    enabled: *enabled,
                    last_error: run.and_then(|r| r.error.clone()),
                    last_run_at: run.map(|r| r.at),
                }
            })
            .collect()
    }
}

/// Post-normalization criteria filter. Price bounds are strict (price is
/// always known); rooms, size and district are best-effort and pass when
/// the listing does not carry the field.
fn passes_criteria(listing: &crate::models::Listing, criteria: &SearchCriteria) -> bool {
    criteria.price_in_range(listing.price)
        && criteria.rooms_in_range(listing.rooms)
        && criteria.size_in_range(listing.size_sqm)
        && criteria.district_matches(listing.district.as_deref())
}
