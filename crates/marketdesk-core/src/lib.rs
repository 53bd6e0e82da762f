//! Marketdesk Core - query-session orchestration for the market-news dashboard
//!
//! This crate provides the core functionality for the Marketdesk application:
//! - Exchange registry loaded once per session
//! - Tab store with a persisted, newest-first result collection
//! - Query orchestration over geolocation and exchange intents
//! - Shared agent state consumed by the external chat assistant

pub mod backend;
pub mod config;
pub mod error;
pub mod exchange;
pub mod geo;
pub mod news;
pub mod orchestrator;
pub mod state;
pub mod tabs;

pub use backend::{HttpNewsBackend, MarketNewsRequest, NewsBackend};
pub use config::{Config, ConfigManager};
pub use error::{Error, Result};
pub use exchange::{Exchange, ExchangeRegistry};
pub use geo::{
    Coordinates, GeoProvider, StaticGeoProvider, UnavailableGeoProvider, DEMO_COORDINATES,
    DEMO_LABEL, LOCATION_LABEL,
};
pub use news::{ExchangeImpact, NewsRecord, PredictedImpact, QueryMode};
pub use orchestrator::{QueryOrchestrator, QueryOutcome};
pub use state::{shared_state, SharedAgentState, SharedState};
pub use tabs::{Confirmation, QueryTab, TabStore};
