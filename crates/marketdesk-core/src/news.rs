//! News payload types
//!
//! The backend produces annotated news records; the core treats them as a
//! pass-through payload. Known fields are modeled as optionals for display,
//! and everything else the backend sends is preserved in a flattened map so
//! re-serialization is faithful.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which upstream query the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    LocationBased,
    ExchangeSpecific,
}

impl QueryMode {
    /// Wire representation, as sent to the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocationBased => "location_based",
            Self::ExchangeSpecific => "exchange_specific",
        }
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicted market impact direction for a news item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictedImpact {
    Positive,
    Negative,
    Neutral,
}

/// Per-exchange impact annotation attached to a news record
///
/// All fields are optional; the core reads them for display only and never
/// validates beyond existence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeImpact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_impact: Option<PredictedImpact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_sectors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_weight: Option<f64>,
    /// Anything else the backend attached (signal counts, raw scores, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single annotated news item, opaque to the core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_exchange: Option<ExchangeImpact>,
    /// Unmodeled backend fields, passed through verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewsRecord {
    /// Convenience constructor used heavily in tests
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}
