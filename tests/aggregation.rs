//! End-to-end aggregation behavior against mock source adapters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use rentscout::models::SearchCriteria;
use rentscout::scrapers::{
    FetchedPage, ManagerConfig, PageToken, RawRecord, ScrapeError, ScraperManager, SourceAdapter,
};

/// Scripted adapter: serves fixed records on page one, optionally fails or
/// stalls instead.
struct MockSource {
    name: String,
    records: Vec<RawRecord>,
    fail_with: Option<fn() -> ScrapeError>,
    stall: Option<Duration>,
}

impl MockSource {
    fn serving(name: &str, records: Vec<RawRecord>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            records,
            fail_with: None,
            stall: None,
        })
    }

    fn failing(name: &str, fail_with: fn() -> ScrapeError) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            records: Vec::new(),
            fail_with: Some(fail_with),
            stall: None,
        })
    }

    fn stalling(name: &str, stall: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            records: Vec::new(),
            fail_with: None,
            stall: Some(stall),
        })
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_page(
        &self,
        _criteria: &SearchCriteria,
        page: &PageToken,
    ) -> Result<FetchedPage, ScrapeError> {
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        if let Some(fail) = self.fail_with {
            return Err(fail());
        }
        match page {
            PageToken::Number(1) => Ok(FetchedPage {
                records: self.records.clone(),
                has_more: false,
                next_page: None,
                total_reported: Some(self.records.len() as u64),
            }),
            _ => Ok(FetchedPage::default()),
        }
    }
}

fn record(id: &str, title: &str, price: &str, location: &str) -> RawRecord {
    RawRecord {
        source_local_id: Some(id.to_string()),
        title: Some(title.to_string()),
        price: Some(price.to_string()),
        location: Some(location.to_string()),
        ..Default::default()
    }
}

fn idless(title: &str, price: &str, location: &str) -> RawRecord {
    RawRecord {
        title: Some(title.to_string()),
        price: Some(price.to_string()),
        location: Some(location.to_string()),
        ..Default::default()
    }
}

fn fast_config() -> ManagerConfig {
    ManagerConfig {
        per_source_timeout: Duration::from_millis(500),
        ..ManagerConfig::default()
    }
}

fn manager(adapters: Vec<Arc<dyn SourceAdapter>>) -> ScraperManager {
    ScraperManager::with_adapters(adapters, fast_config())
}

#[tokio::test]
async fn no_duplicate_identity_keys_in_result() {
    let a = MockSource::serving(
        "alpha",
        vec![
            record("1", "Wohnung A", "700", "Berlin"),
            record("1", "Wohnung A again", "700", "Berlin"),
            record("2", "Wohnung B", "800", "Berlin"),
        ],
    );
    let b = MockSource::serving("beta", vec![record("1", "Wohnung C", "900", "Berlin")]);

    let result = manager(vec![a, b])
        .search_all(&SearchCriteria::for_city("Berlin"))
        .await
        .unwrap();

    let mut keys: Vec<(String, String)> = result
        .listings
        .iter()
        .map(|l| (l.source.clone(), l.source_id.clone()))
        .collect();
    let before = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), before);
    // Same local id on different sources stays distinct.
    assert_eq!(result.listings.len(), 3);
}

#[tokio::test]
async fn all_sources_failing_still_returns_ok() {
    let sources: Vec<Arc<dyn SourceAdapter>> = vec![
        MockSource::failing("down", || ScrapeError::Fetch("connection refused".into())),
        MockSource::failing("blocked", || ScrapeError::Status {
            status: 403,
            url: "https://blocked.example".into(),
        }),
        MockSource::failing("broken", || {
            ScrapeError::Extraction("selector matched no listing containers".into())
        }),
    ];
    let count = sources.len();

    let result = manager(sources)
        .search_all(&SearchCriteria::for_city("Berlin"))
        .await
        .unwrap();

    assert!(result.listings.is_empty());
    assert_eq!(result.errors.len(), count);
    assert!(result.sources.iter().all(|s| !s.ok));
}

#[tokio::test]
async fn timeout_source_is_isolated_and_reported() {
    // Source A: five listings priced 800-1200; source B never answers.
    let a = MockSource::serving(
        "alpha",
        vec![
            record("1", "Wohnung 1", "800 €", "Berlin"),
            record("2", "Wohnung 2", "900 €", "Berlin"),
            record("3", "Wohnung 3", "1.000 €", "Berlin"),
            record("4", "Wohnung 4", "1.100 €", "Berlin"),
            record("5", "Wohnung 5", "1.200 €", "Berlin"),
        ],
    );
    let b = MockSource::stalling("beta", Duration::from_secs(30));

    let criteria = SearchCriteria {
        max_price: Some(1000.0),
        ..SearchCriteria::for_city("Berlin")
    };
    let result = manager(vec![a, b]).search_all(&criteria).await.unwrap();

    // Price filter applied after normalization: 800, 900, 1000 survive.
    assert_eq!(result.listings.len(), 3);
    assert!(result.listings.iter().all(|l| l.source == "alpha"));
    assert!(result.listings.iter().all(|l| l.price <= 1000.0));

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("beta"));
    assert!(result.errors[0].contains("timed out"));

    let beta = result.sources.iter().find(|s| s.source == "beta").unwrap();
    assert!(!beta.ok);
    let alpha = result.sources.iter().find(|s| s.source == "alpha").unwrap();
    assert!(alpha.ok);
}

#[tokio::test]
async fn extraction_failure_does_not_affect_siblings() {
    let ok = MockSource::serving("alpha", vec![record("1", "Wohnung", "750", "Berlin")]);
    let broken = MockSource::failing("beta", || {
        ScrapeError::Extraction("selector matched no listing containers".into())
    });

    let result = manager(vec![ok, broken])
        .search_all(&SearchCriteria::for_city("Berlin"))
        .await
        .unwrap();

    assert_eq!(result.listings.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("beta"));
    assert!(result.errors[0].contains("extraction"));
}

#[tokio::test]
async fn cross_source_fingerprint_dedup_prefers_first_source() {
    // Two id-less sources mirror the same listing; the source listed first
    // wins.
    let a = MockSource::serving(
        "alpha",
        vec![idless("Schöne Wohnung", "900 €", "Berlin, Mitte")],
    );
    let b = MockSource::serving(
        "beta",
        vec![
            idless("Schöne Wohnung", "900", "Berlin, Mitte"),
            idless("Andere Wohnung", "600", "Berlin"),
        ],
    );

    let result = manager(vec![a, b])
        .search_all(&SearchCriteria::for_city("Berlin"))
        .await
        .unwrap();

    assert_eq!(result.listings.len(), 2);
    let mirrored = result
        .listings
        .iter()
        .find(|l| l.title.contains("Schöne"))
        .unwrap();
    assert_eq!(mirrored.source, "alpha");
}

#[tokio::test]
async fn unparsable_prices_are_dropped_quietly() {
    let a = MockSource::serving(
        "alpha",
        vec![
            record("1", "Wohnung", "850", "Berlin"),
            record("2", "Preis auf Anfrage", "auf Anfrage", "Berlin"),
        ],
    );

    let result = manager(vec![a])
        .search_all(&SearchCriteria::for_city("Berlin"))
        .await
        .unwrap();

    assert_eq!(result.listings.len(), 1);
    // A normalization drop is not a source-level error.
    assert!(result.errors.is_empty());
    assert!(result.sources[0].ok);
}

#[tokio::test]
async fn search_all_is_idempotent_for_stable_sources() {
    let adapters = || -> Vec<Arc<dyn SourceAdapter>> {
        vec![
            MockSource::serving(
                "alpha",
                vec![
                    record("1", "Wohnung A", "700", "Berlin"),
                    record("2", "Wohnung B", "950", "Berlin"),
                ],
            ),
            MockSource::serving("beta", vec![idless("Wohnung C", "1.100 €", "Berlin")]),
        ]
    };

    let manager = ScraperManager::with_adapters(adapters(), fast_config());
    let criteria = SearchCriteria::for_city("Berlin");
    let first = manager.search_all(&criteria).await.unwrap();
    let second = manager.search_all(&criteria).await.unwrap();

    let ids = |result: &rentscout::AggregateResult| {
        let mut ids: Vec<String> = result
            .listings
            .iter()
            .map(|l| format!("{}:{}", l.source, l.source_id))
            .collect();
        ids.sort();
        ids
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.total_found, second.total_found);
}

#[tokio::test]
async fn status_reflects_most_recent_run() {
    let manager = manager(vec![
        MockSource::serving("alpha", vec![record("1", "Wohnung", "800", "Berlin")]),
        MockSource::failing("beta", || ScrapeError::Fetch("dns failure".into())),
    ]);

    let before = manager.scrapers_status().await;
    assert_eq!(before.len(), 2);
    assert!(before.iter().all(|s| s.last_run_at.is_none()));

    manager
        .search_all(&SearchCriteria::for_city("Berlin"))
        .await
        .unwrap();

    let after = manager.scrapers_status().await;
    let alpha = after.iter().find(|s| s.name == "alpha").unwrap();
    assert!(alpha.enabled && alpha.last_error.is_none());
    assert!(alpha.last_run_at.is_some());
    let beta = after.iter().find(|s| s.name == "beta").unwrap();
    assert!(beta.last_error.as_deref().unwrap().contains("dns failure"));
}
