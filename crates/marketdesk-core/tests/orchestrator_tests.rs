//! Orchestrator integration tests
//!
//! Drives the orchestrator end to end against a stub backend and stub
//! geolocation providers: both query modes, the demo-coordinate fallback,
//! validation and capability errors, and the shared-state overwrite.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use marketdesk_core::{
    shared_state, Config, Coordinates, Error, Exchange, GeoProvider, MarketNewsRequest,
    NewsBackend, NewsRecord, QueryMode, QueryOrchestrator, QueryOutcome, Result, TabStore,
    DEMO_COORDINATES, DEMO_LABEL, LOCATION_LABEL,
};

/// Stub backend returning canned responses and recording the last request
struct StubBackend {
    exchanges: Vec<Exchange>,
    news: Result<Vec<NewsRecord>>,
    last_request: Mutex<Option<MarketNewsRequest>>,
}

impl StubBackend {
    fn new(exchanges: Vec<Exchange>, news: Result<Vec<NewsRecord>>) -> Arc<Self> {
        Arc::new(Self {
            exchanges,
            news,
            last_request: Mutex::new(None),
        })
    }

    fn last_request(&self) -> Option<MarketNewsRequest> {
        self.last_request.lock().clone()
    }
}

#[async_trait]
impl NewsBackend for StubBackend {
    async fn list_exchanges(&self) -> Result<Vec<Exchange>> {
        Ok(self.exchanges.clone())
    }

    async fn fetch_market_news(&self, request: &MarketNewsRequest) -> Result<Vec<NewsRecord>> {
        *self.last_request.lock() = Some(request.clone());
        match &self.news {
            Ok(records) => Ok(records.clone()),
            Err(Error::Backend { status, message }) => Err(Error::Backend {
                status: *status,
                message: message.clone(),
            }),
            Err(_) => Err(Error::backend(None, "stub failure")),
        }
    }

    async fn health(&self) -> Result<bool> {
        Ok(true)
    }

    async fn history(&self, _limit: u32) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

/// Geolocation provider that always fails, exercising the fallback path
struct FailingGeoProvider;

#[async_trait]
impl GeoProvider for FailingGeoProvider {
    async fn locate(&self, _timeout: Duration) -> Result<Coordinates> {
        Err(Error::backend(None, "position unavailable"))
    }
}

/// Geolocation provider that never resolves, ignoring its deadline
struct HangingGeoProvider;

#[async_trait]
impl GeoProvider for HangingGeoProvider {
    async fn locate(&self, _timeout: Duration) -> Result<Coordinates> {
        std::future::pending().await
    }
}

fn nyse() -> Exchange {
    Exchange {
        id: "nyse".to_string(),
        name: "NYSE".to_string(),
        city: "New York".to_string(),
        country: "USA".to_string(),
        location: (40.71, -74.0),
        indices: vec!["DJIA".to_string()],
    }
}

fn orchestrator_with(
    backend: Arc<StubBackend>,
    dir: &tempfile::TempDir,
) -> (QueryOrchestrator, marketdesk_core::SharedState) {
    let tabs = TabStore::new(dir.path().join("tabs.json"));
    let shared = shared_state();
    let orchestrator = QueryOrchestrator::new(backend, tabs, shared.clone(), &Config::default());
    (orchestrator, shared)
}

#[tokio::test]
async fn test_exchange_query_creates_tab_and_mirrors_shared_state() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new(vec![nyse()], Ok(vec![NewsRecord::titled("A")]));
    let (mut orchestrator, shared) = orchestrator_with(backend.clone(), &dir);

    orchestrator.load_exchanges().await.unwrap();
    let outcome = orchestrator
        .run_query(QueryMode::ExchangeSpecific, Some("nyse"))
        .await
        .unwrap();

    let QueryOutcome::Completed { tab_id, records } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(records, 1);

    let tabs = orchestrator.tabs();
    assert_eq!(tabs.len(), 1);
    let tab = tabs.active_tab().unwrap();
    assert_eq!(tab.id, tab_id);
    assert_eq!(tab.title, "NYSE");
    assert_eq!(tab.exchange.as_deref(), Some("nyse"));
    assert_eq!(tab.exchange_data.as_ref().unwrap().id, "nyse");
    assert_eq!(tab.data[0].title.as_deref(), Some("A"));
    assert_eq!(tab.query_mode, QueryMode::ExchangeSpecific);

    let state = shared.read();
    assert_eq!(state.market_news.len(), 1);
    assert_eq!(state.market_news[0].title.as_deref(), Some("A"));

    // The fetch carried the exchange's coordinates and the shared body shape
    let request = backend.last_request().unwrap();
    assert_eq!(request.lat, 40.71);
    assert_eq!(request.lon, -74.0);
    assert_eq!(request.query_mode, QueryMode::ExchangeSpecific);
    assert_eq!(request.days, 1);
    assert_eq!(request.max_results, 20);
}

#[tokio::test]
async fn test_unknown_exchange_is_a_validation_error_with_no_tab() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new(vec![nyse()], Ok(vec![NewsRecord::titled("A")]));
    let (mut orchestrator, shared) = orchestrator_with(backend.clone(), &dir);
    orchestrator.load_exchanges().await.unwrap();

    let err = orchestrator
        .run_query(QueryMode::ExchangeSpecific, Some("lse"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(orchestrator.tabs().is_empty());
    assert!(shared.read().market_news.is_empty());
    // Validation aborts before the fetching state
    assert!(backend.last_request().is_none());
    assert!(!orchestrator.is_busy());
}

#[tokio::test]
async fn test_run_selected_uses_the_picked_mode() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new(vec![nyse()], Ok(vec![NewsRecord::titled("A")]));
    let (mut orchestrator, _shared) = orchestrator_with(backend.clone(), &dir);
    orchestrator.load_exchanges().await.unwrap();

    assert_eq!(orchestrator.selected_mode(), QueryMode::LocationBased);
    orchestrator.select_mode(QueryMode::ExchangeSpecific);
    orchestrator.run_selected(Some("nyse")).await.unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(request.query_mode, QueryMode::ExchangeSpecific);
}

#[tokio::test]
async fn test_missing_exchange_id_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new(vec![nyse()], Ok(Vec::new()));
    let (mut orchestrator, _shared) = orchestrator_with(backend, &dir);
    orchestrator.load_exchanges().await.unwrap();

    let err = orchestrator
        .run_query(QueryMode::ExchangeSpecific, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_location_query_uses_provider_fix() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new(Vec::new(), Ok(vec![NewsRecord::titled("Local")]));
    let (orchestrator, _shared) = orchestrator_with(backend.clone(), &dir);
    let mut orchestrator = orchestrator
        .with_geo_provider(Arc::new(marketdesk_core::StaticGeoProvider::new(51.5, -0.12)));

    orchestrator
        .run_query(QueryMode::LocationBased, None)
        .await
        .unwrap();

    let tab = orchestrator.tabs().active_tab().unwrap();
    assert_eq!(tab.title, LOCATION_LABEL);
    assert!(tab.exchange_data.is_none());

    let request = backend.last_request().unwrap();
    assert_eq!(request.lat, 51.5);
    assert_eq!(request.lon, -0.12);
    assert_eq!(request.query_mode, QueryMode::LocationBased);
}

#[tokio::test]
async fn test_geolocation_failure_falls_back_to_demo_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new(Vec::new(), Ok(vec![NewsRecord::titled("Demo")]));
    let (orchestrator, _shared) = orchestrator_with(backend.clone(), &dir);
    let mut orchestrator = orchestrator.with_geo_provider(Arc::new(FailingGeoProvider));

    // Never a user-visible error; the query proceeds with the demo position
    let outcome = orchestrator
        .run_query(QueryMode::LocationBased, None)
        .await
        .unwrap();
    assert!(matches!(outcome, QueryOutcome::Completed { .. }));

    let tab = orchestrator.tabs().active_tab().unwrap();
    assert_eq!(tab.title, DEMO_LABEL);

    let request = backend.last_request().unwrap();
    assert_eq!(request.lat, DEMO_COORDINATES.lat);
    assert_eq!(request.lon, DEMO_COORDINATES.lon);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_geolocation_times_out_to_demo_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new(Vec::new(), Ok(vec![NewsRecord::titled("Demo")]));
    let (orchestrator, _shared) = orchestrator_with(backend.clone(), &dir);
    let mut orchestrator = orchestrator.with_geo_provider(Arc::new(HangingGeoProvider));

    // The orchestrator bounds the wait itself; a stuck provider degrades to
    // the demo position instead of stalling the invocation
    let outcome = orchestrator
        .run_query(QueryMode::LocationBased, None)
        .await
        .unwrap();
    assert!(matches!(outcome, QueryOutcome::Completed { .. }));

    let tab = orchestrator.tabs().active_tab().unwrap();
    assert_eq!(tab.title, DEMO_LABEL);

    let request = backend.last_request().unwrap();
    assert_eq!(request.lat, DEMO_COORDINATES.lat);
    assert_eq!(request.lon, DEMO_COORDINATES.lon);
}

#[tokio::test]
async fn test_no_geo_provider_means_capability_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new(Vec::new(), Ok(Vec::new()));
    let (mut orchestrator, _shared) = orchestrator_with(backend.clone(), &dir);

    let err = orchestrator
        .run_query(QueryMode::LocationBased, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CapabilityUnavailable));
    // Aborted before ever entering the fetching state
    assert!(backend.last_request().is_none());
    assert!(orchestrator.tabs().is_empty());
}

#[tokio::test]
async fn test_backend_failure_surfaces_and_leaves_state_clean() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new(
        vec![nyse()],
        Err(Error::backend(Some(500), "analysis service exploded")),
    );
    let (mut orchestrator, shared) = orchestrator_with(backend, &dir);
    orchestrator.load_exchanges().await.unwrap();

    let err = orchestrator
        .run_query(QueryMode::ExchangeSpecific, Some("nyse"))
        .await
        .unwrap_err();

    // The user-facing rendering carries both the status and the raw body
    assert_eq!(
        err.to_string(),
        "Backend error (HTTP 500): analysis service exploded"
    );
    match err {
        Error::Backend { status, message } => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "analysis service exploded");
        }
        other => panic!("expected backend error, got {other}"),
    }
    assert!(orchestrator.tabs().is_empty());
    assert!(shared.read().market_news.is_empty());
    assert!(!orchestrator.is_busy());
}

#[tokio::test]
async fn test_each_success_overwrites_market_news_wholesale() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new(
        Vec::new(),
        Ok(vec![NewsRecord::titled("B"), NewsRecord::titled("C")]),
    );
    let (orchestrator, shared) = orchestrator_with(backend, &dir);
    let mut orchestrator = orchestrator
        .with_geo_provider(Arc::new(marketdesk_core::StaticGeoProvider::new(35.67, 139.65)));

    // The assistant's own slice survives the overwrite
    shared.write().proverbs.push("look before you leap".to_string());
    shared.write().market_news = vec![NewsRecord::titled("old")];

    orchestrator
        .run_query(QueryMode::LocationBased, None)
        .await
        .unwrap();
    orchestrator
        .run_query(QueryMode::LocationBased, None)
        .await
        .unwrap();

    let state = shared.read();
    assert_eq!(state.market_news.len(), 2);
    assert_eq!(state.market_news[0].title.as_deref(), Some("B"));
    assert_eq!(state.proverbs, vec!["look before you leap".to_string()]);

    // Two queries, two tabs, newest active
    assert_eq!(orchestrator.tabs().len(), 2);
}

#[tokio::test]
async fn test_failed_registry_load_leaves_exchange_mode_unusable() {
    let dir = tempfile::tempdir().unwrap();

    /// Backend whose exchange listing always fails
    struct DeadRegistryBackend;

    #[async_trait]
    impl NewsBackend for DeadRegistryBackend {
        async fn list_exchanges(&self) -> Result<Vec<Exchange>> {
            Err(Error::backend(Some(502), "bad gateway"))
        }
        async fn fetch_market_news(
            &self,
            _request: &MarketNewsRequest,
        ) -> Result<Vec<NewsRecord>> {
            Ok(Vec::new())
        }
        async fn health(&self) -> Result<bool> {
            Ok(false)
        }
        async fn history(&self, _limit: u32) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }
    }

    let tabs = TabStore::new(dir.path().join("tabs.json"));
    let mut orchestrator = QueryOrchestrator::new(
        Arc::new(DeadRegistryBackend),
        tabs,
        shared_state(),
        &Config::default(),
    );

    assert!(orchestrator.load_exchanges().await.is_err());
    assert!(!orchestrator.registry().is_loaded());

    // Every exchange-mode query now fails validation, until a retry succeeds
    let err = orchestrator
        .run_query(QueryMode::ExchangeSpecific, Some("nyse"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}
