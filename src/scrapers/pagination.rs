//! Sequential page walker for one source.
//!
//! Drives an adapter across successive pages up to the source's page cap,
//! honoring the per-run rate limiter. Page batches are emitted through an
//! mpsc sender as they are collected, so a caller that times the walk out
//! still receives everything fetched up to that point.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::error::ScrapeError;
use super::rate_limiter::RunLimiter;
use super::{PageToken, RawRecord, SourceAdapter};
use crate::models::SearchCriteria;

/// Terminal state of a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// All pages consumed, or the page cap reached.
    Exhausted,
    /// The walk stopped on an adapter or limiter error. Records collected
    /// before the error were already emitted and remain valid.
    Failed(String),
}

/// Summary of one completed walk.
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub pages_fetched: u32,
    /// Count reported by the source, or the number of collected records.
    pub total_found: u64,
    /// True when more pages existed beyond the cap.
    pub truncated: bool,
    pub next_page_url: Option<String>,
    pub terminal: Terminal,
}

/// Walks one source's result pages for one aggregation run.
pub struct PageWalker {
    adapter: Arc<dyn SourceAdapter>,
    limiter: RunLimiter,
    max_pages: u32,
}

impl PageWalker {
    pub fn new(adapter: Arc<dyn SourceAdapter>, limiter: RunLimiter, max_pages: u32) -> Self {
        Self {
            adapter,
            limiter,
            max_pages: max_pages.max(1),
        }
    }

    /// Walk pages front-to-back, sending each page's records through `sink`.
    pub async fn walk(
        &self,
        criteria: &SearchCriteria,
        sink: UnboundedSender<Vec<RawRecord>>,
    ) -> WalkOutcome {
        let source = self.adapter.name().to_string();
        let mut page = PageToken::first();
        let mut pages_fetched = 0u32;
        let mut collected = 0u64;
        let mut total_reported = None;
        let mut truncated = false;
        let mut next_page_url = None;

        let terminal = loop {
            if pages_fetched >= self.max_pages {
                debug!("{}: page cap {} reached", source, self.max_pages);
                break Terminal::Exhausted;
            }

            if let Err(e) = self.limiter.acquire().await {
                warn!("{}: {}", source, e);
                break Terminal::Failed(e.to_string());
            }

            let fetched = match self.adapter.fetch_page(criteria, &page).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!("{}: page {:?} failed: {}", source, page, e);
                    break Terminal::Failed(e.to_string());
                }
            };
            pages_fetched += 1;

            if fetched.total_reported.is_some() {
                total_reported = fetched.total_reported;
            }
            if fetched.records.is_empty() {
                break Terminal::Exhausted;
            }

            collected += fetched.records.len() as u64;
            if sink.send(fetched.records).is_err() {
                // Receiver gone: the run was cancelled, stop quietly.
                break Terminal::Exhausted;
            }

            match (fetched.has_more, fetched.next_page) {
                (true, Some(next)) => {
                    if pages_fetched >= self.max_pages {
                        truncated = true;
                        if let PageToken::Url(url) = &next {
                            next_page_url = Some(url.clone());
                        }
                        break Terminal::Exhausted;
                    }
                    page = next;
                }
                _ => break Terminal::Exhausted,
            }
        };

        WalkOutcome {
            pages_fetched,
            total_found: total_reported.unwrap_or(collected),
            truncated,
            next_page_url,
            terminal,
        }
    }
}

/// Walk helper that buffers all records in memory, for callers that do not
/// need streaming.
pub async fn walk_collect(
    walker: &PageWalker,
    criteria: &SearchCriteria,
) -> (Vec<RawRecord>, WalkOutcome) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let outcome = walker.walk(criteria, tx).await;
    let mut records = Vec::new();
    while let Ok(batch) = rx.try_recv() {
        records.extend(batch);
    }
    (records, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::config::RateLimitConfig;
    use crate::scrapers::{FetchedPage, ScrapeError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Adapter that always reports more pages, counting fetches.
    struct EndlessAdapter {
        fetches: AtomicU32,
    }

    #[async_trait]
    impl SourceAdapter for EndlessAdapter {
        fn name(&self) -> &str {
            "endless"
        }

        async fn fetch_page(
            &self,
            _criteria: &SearchCriteria,
            page: &PageToken,
        ) -> Result<FetchedPage, ScrapeError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let n = match page {
                PageToken::Number(n) => *n,
                PageToken::Url(_) => 0,
            };
            Ok(FetchedPage {
                records: vec![RawRecord {
                    title: Some(format!("listing {n}")),
                    price: Some("500".to_string()),
                    ..Default::default()
                }],
                has_more: true,
                next_page: Some(PageToken::Number(n + 1)),
                total_reported: None,
            })
        }
    }

    /// Adapter that fails on a configured page.
    struct FlakyAdapter {
        fail_on_page: u32,
    }

    #[async_trait]
    impl SourceAdapter for FlakyAdapter {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch_page(
            &self,
            _criteria: &SearchCriteria,
            page: &PageToken,
        ) -> Result<FetchedPage, ScrapeError> {
            let n = match page {
                PageToken::Number(n) => *n,
                PageToken::Url(_) => 0,
            };
            if n >= self.fail_on_page {
                return Err(ScrapeError::Extraction("markup changed".into()));
            }
            Ok(FetchedPage {
                records: vec![RawRecord {
                    title: Some(format!("page {n}")),
                    ..Default::default()
                }],
                has_more: true,
                next_page: Some(PageToken::Number(n + 1)),
                total_reported: Some(100),
            })
        }
    }

    fn no_delay_limiter(max_requests: u32) -> RunLimiter {
        RunLimiter::new(RateLimitConfig {
            delay_ms: 0,
            max_requests,
        })
    }

    #[tokio::test]
    async fn test_walk_respects_page_cap() {
        let adapter = Arc::new(EndlessAdapter {
            fetches: AtomicU32::new(0),
        });
        let walker = PageWalker::new(adapter.clone(), no_delay_limiter(100), 4);
        let criteria = SearchCriteria::for_city("Berlin");

        let (records, outcome) = walk_collect(&walker, &criteria).await;
        assert_eq!(adapter.fetches.load(Ordering::SeqCst), 4);
        assert_eq!(records.len(), 4);
        assert_eq!(outcome.pages_fetched, 4);
        assert!(outcome.truncated);
        assert_eq!(outcome.terminal, Terminal::Exhausted);
    }

    #[tokio::test]
    async fn test_walk_keeps_partials_on_error() {
        let walker = PageWalker::new(
            Arc::new(FlakyAdapter { fail_on_page: 3 }),
            no_delay_limiter(100),
            10,
        );
        let criteria = SearchCriteria::for_city("Berlin");

        let (records, outcome) = walk_collect(&walker, &criteria).await;
        assert_eq!(records.len(), 2);
        assert_eq!(outcome.total_found, 100);
        assert!(matches!(outcome.terminal, Terminal::Failed(ref msg) if msg.contains("markup")));
    }

    #[tokio::test]
    async fn test_walk_stops_on_spent_budget() {
        let walker = PageWalker::new(
            Arc::new(EndlessAdapter {
                fetches: AtomicU32::new(0),
            }),
            no_delay_limiter(2),
            10,
        );
        let criteria = SearchCriteria::for_city("Berlin");

        let (records, outcome) = walk_collect(&walker, &criteria).await;
        assert_eq!(records.len(), 2);
        assert!(
            matches!(outcome.terminal, Terminal::Failed(ref msg) if msg.contains("rate limit"))
        );
    }
}
