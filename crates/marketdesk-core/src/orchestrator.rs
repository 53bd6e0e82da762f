//! Query orchestrator - resolves user intent into one backend fetch and
//! reconciles the outcome with the tab store and the shared agent state.
//!
//! Two entry paths feed one fetch step:
//!
//! - location mode: geolocation provider -> coordinates, falling back to
//!   fixed demo coordinates when the provider fails;
//! - exchange mode: registry lookup -> coordinates and label from the
//!   resolved exchange.
//!
//! On a successful fetch the orchestrator creates a tab, activates it, and
//! overwrites `SharedAgentState.market_news`, strictly in that order. Each
//! invocation carries a fencing token: a completion that arrives after a
//! newer invocation has started is discarded instead of clobbering state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::backend::{MarketNewsRequest, NewsBackend};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::exchange::ExchangeRegistry;
use crate::geo::{Coordinates, GeoProvider, DEMO_COORDINATES, DEMO_LABEL, LOCATION_LABEL};
use crate::news::QueryMode;
use crate::state::SharedState;
use crate::tabs::{Confirmation, QueryTab, TabStore};

/// How a query invocation ended, short of a user-visible error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// A new tab was created and activated
    Completed { tab_id: String, records: usize },
    /// A newer invocation started while this one was in flight; the result
    /// was discarded without touching any state
    Superseded,
}

/// Coordinates, label, and optional exchange record resolved from intent
struct ResolvedQuery {
    coordinates: Coordinates,
    label: String,
    exchange: Option<crate::exchange::Exchange>,
}

/// Drives query sessions for one dashboard session
pub struct QueryOrchestrator {
    backend: Arc<dyn NewsBackend>,
    geo: Option<Arc<dyn GeoProvider>>,
    registry: ExchangeRegistry,
    tabs: TabStore,
    shared: SharedState,
    /// Set while a fetch is in flight, so frontends can disable submission
    busy: Arc<AtomicBool>,
    /// Fencing token; bumped at the start of every invocation
    fence: Arc<AtomicU64>,
    /// Mode currently selected in the frontend's picker
    mode: QueryMode,
    geo_timeout: Duration,
    days: u32,
    max_results: u32,
}

impl QueryOrchestrator {
    pub fn new(
        backend: Arc<dyn NewsBackend>,
        tabs: TabStore,
        shared: SharedState,
        config: &Config,
    ) -> Self {
        Self {
            backend,
            geo: None,
            registry: ExchangeRegistry::new(),
            tabs,
            shared,
            busy: Arc::new(AtomicBool::new(false)),
            fence: Arc::new(AtomicU64::new(0)),
            mode: QueryMode::LocationBased,
            geo_timeout: Duration::from_secs(config.geolocation_timeout_secs),
            days: config.days,
            max_results: config.max_results,
        }
    }

    /// Attach a geolocation provider; without one, location-mode queries
    /// abort with a capability error
    pub fn with_geo_provider(mut self, geo: Arc<dyn GeoProvider>) -> Self {
        self.geo = Some(geo);
        self
    }

    /// Load the exchange registry from the backend. Invoked once at session
    /// start; a failure leaves exchange mode unusable until retried.
    pub async fn load_exchanges(&mut self) -> Result<()> {
        self.registry.load(self.backend.as_ref()).await
    }

    /// Record the mode picked in the frontend; `run_selected` uses it
    pub fn select_mode(&mut self, mode: QueryMode) {
        self.mode = mode;
    }

    pub fn selected_mode(&self) -> QueryMode {
        self.mode
    }

    /// Run a query in the currently selected mode
    pub async fn run_selected(&mut self, exchange_id: Option<&str>) -> Result<QueryOutcome> {
        self.run_query(self.mode, exchange_id).await
    }

    /// Run one query. `exchange_id` is required in exchange mode and ignored
    /// in location mode.
    pub async fn run_query(
        &mut self,
        mode: QueryMode,
        exchange_id: Option<&str>,
    ) -> Result<QueryOutcome> {
        let seq = self.fence.fetch_add(1, Ordering::SeqCst) + 1;

        // Parameter resolution happens before the busy window; validation
        // and capability errors never enter the fetching state.
        let resolved = match mode {
            QueryMode::LocationBased => self.resolve_location().await?,
            QueryMode::ExchangeSpecific => self.resolve_exchange(exchange_id)?,
        };

        self.busy.store(true, Ordering::SeqCst);
        let request = MarketNewsRequest {
            lat: resolved.coordinates.lat,
            lon: resolved.coordinates.lon,
            query_mode: mode,
            days: self.days,
            max_results: self.max_results,
        };
        let fetched = self.backend.fetch_market_news(&request).await;

        // A newer invocation owns the session now; drop this result on the
        // floor, success or failure.
        if self.fence.load(Ordering::SeqCst) != seq {
            debug!(seq, "discarding superseded query result");
            self.busy.store(false, Ordering::SeqCst);
            return Ok(QueryOutcome::Superseded);
        }

        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                self.busy.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        // Post-fetch mutations run synchronously in a fixed order: tab
        // store, shared state, busy flag.
        let now = Utc::now();
        let tab = QueryTab {
            id: format!("tab-{}-{}", now.timestamp_millis(), seq),
            title: resolved.label,
            data: records.clone(),
            timestamp: now.to_rfc3339(),
            query_mode: mode,
            exchange: resolved.exchange.as_ref().map(|e| e.id.clone()),
            exchange_data: resolved.exchange,
        };
        let tab_id = tab.id.clone();
        let count = tab.data.len();
        self.tabs.add_tab(tab)?;
        self.shared.write().market_news = records;
        self.busy.store(false, Ordering::SeqCst);

        info!(tab_id = %tab_id, records = count, mode = %mode, "query completed");
        Ok(QueryOutcome::Completed {
            tab_id,
            records: count,
        })
    }

    /// Location mode: geolocation success uses the fix; failure or timeout
    /// substitutes the demo position and proceeds - never a user error.
    /// The timeout is enforced here, so even a provider that ignores its
    /// deadline cannot stall the invocation.
    async fn resolve_location(&self) -> Result<ResolvedQuery> {
        let geo = self.geo.as_ref().ok_or(Error::CapabilityUnavailable)?;

        let located = tokio::time::timeout(self.geo_timeout, geo.locate(self.geo_timeout)).await;
        let (coordinates, label) = match located {
            Ok(Ok(coordinates)) => (coordinates, LOCATION_LABEL),
            Ok(Err(e)) => {
                warn!("geolocation failed, using demo coordinates: {}", e);
                (DEMO_COORDINATES, DEMO_LABEL)
            }
            Err(_) => {
                warn!(
                    "geolocation timed out after {:?}, using demo coordinates",
                    self.geo_timeout
                );
                (DEMO_COORDINATES, DEMO_LABEL)
            }
        };

        Ok(ResolvedQuery {
            coordinates,
            label: label.to_string(),
            exchange: None,
        })
    }

    /// Exchange mode: the id must be present and resolve in the registry
    fn resolve_exchange(&self, exchange_id: Option<&str>) -> Result<ResolvedQuery> {
        let id = exchange_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Validation("an exchange must be selected".to_string()))?;

        let exchange = self
            .registry
            .lookup(id)
            .ok_or_else(|| Error::Validation(format!("unknown exchange: {}", id)))?
            .clone();

        Ok(ResolvedQuery {
            coordinates: Coordinates {
                lat: exchange.location.0,
                lon: exchange.location.1,
            },
            label: exchange.name.clone(),
            exchange: Some(exchange),
        })
    }

    /// Whether a fetch is currently in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Shared handle to the busy flag, for frontends that poll it
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        self.busy.clone()
    }

    pub fn registry(&self) -> &ExchangeRegistry {
        &self.registry
    }

    pub fn tabs(&self) -> &TabStore {
        &self.tabs
    }

    pub fn shared_state(&self) -> SharedState {
        self.shared.clone()
    }

    // Intent API forwarded to the tab store

    pub fn select_tab(&mut self, id: &str) -> bool {
        self.tabs.select_tab(id)
    }

    pub fn close_tab(&mut self, id: &str) -> Result<bool> {
        self.tabs.close_tab(id)
    }

    pub fn clear_all(&mut self, confirmation: Confirmation) -> Result<bool> {
        self.tabs.clear_all(confirmation)
    }
}
