//! Geolocation capability seam
//!
//! The dashboard's real position source lives outside the core (browser or
//! OS geolocation). The orchestrator only sees this trait; a session without
//! a provider cannot run location-mode queries at all, while a provider that
//! fails at runtime falls back to fixed demo coordinates.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// A `(lat, lon)` position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Fallback position used when geolocation fails or times out
pub const DEMO_COORDINATES: Coordinates = Coordinates {
    lat: 40.7128,
    lon: -74.0060,
};

/// Tab label for the fallback position
pub const DEMO_LABEL: &str = "New York (Demo)";

/// Tab label for a successfully resolved position
pub const LOCATION_LABEL: &str = "Your Location";

/// Source of the user's current position
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Resolve the current position.
    ///
    /// Implementations should prefer a high-accuracy fix, complete within
    /// `timeout`, and never serve a cached position.
    async fn locate(&self, timeout: Duration) -> Result<Coordinates>;
}

/// Provider backed by a fixed position, e.g. user-supplied CLI coordinates
pub struct StaticGeoProvider {
    coordinates: Coordinates,
}

impl StaticGeoProvider {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            coordinates: Coordinates { lat, lon },
        }
    }
}

#[async_trait]
impl GeoProvider for StaticGeoProvider {
    async fn locate(&self, _timeout: Duration) -> Result<Coordinates> {
        Ok(self.coordinates)
    }
}

/// Provider that always fails, for sessions where the capability is known to
/// be broken but still wired up
pub struct UnavailableGeoProvider;

#[async_trait]
impl GeoProvider for UnavailableGeoProvider {
    async fn locate(&self, _timeout: Duration) -> Result<Coordinates> {
        Err(Error::CapabilityUnavailable)
    }
}
