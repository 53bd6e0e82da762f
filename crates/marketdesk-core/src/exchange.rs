//! Stock exchange catalog
//!
//! The backend serves the list of known exchanges once per session; the
//! registry caches it read-only for the rest of the session.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::backend::NewsBackend;
use crate::error::Result;

/// A stock exchange as served by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    /// `(lat, lon)`, serialized as a two-element array
    pub location: (f64, f64),
    #[serde(default)]
    pub indices: Vec<String>,
}

/// Session-lifetime cache of known exchanges
///
/// Loaded once at session start. A failed load leaves the registry empty and
/// the exchange-mode query path unusable until an explicit retry; there is no
/// automatic retry or invalidation.
#[derive(Debug, Default)]
pub struct ExchangeRegistry {
    exchanges: Vec<Exchange>,
    loaded: bool,
}

impl ExchangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the exchange list from the backend and cache it.
    ///
    /// On failure the registry stays empty and the error is returned after
    /// being logged, so callers can treat a dead registry as non-fatal.
    pub async fn load(&mut self, backend: &dyn NewsBackend) -> Result<()> {
        match backend.list_exchanges().await {
            Ok(exchanges) => {
                info!(count = exchanges.len(), "exchange registry loaded");
                self.exchanges = exchanges;
                self.loaded = true;
                Ok(())
            }
            Err(e) => {
                error!("failed to load exchange registry: {}", e);
                Err(e)
            }
        }
    }

    /// Look up an exchange by its id
    pub fn lookup(&self, id: &str) -> Option<&Exchange> {
        self.exchanges.iter().find(|e| e.id == id)
    }

    /// All known exchanges, in backend order
    pub fn all(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// Whether a load has succeeded this session
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[cfg(test)]
    pub(crate) fn with_exchanges(exchanges: Vec<Exchange>) -> Self {
        Self {
            exchanges,
            loaded: true,
        }
    }
}
