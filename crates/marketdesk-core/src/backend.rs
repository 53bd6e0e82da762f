//! Backend client for the news/analysis service
//!
//! The service speaks a small JSON envelope protocol: every response carries
//! an `ok` flag plus either a payload or an `error` message. The client is a
//! trait so the orchestrator can be driven by a stub in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exchange::Exchange;
use crate::news::{NewsRecord, QueryMode};

/// Request body for a market news query
#[derive(Debug, Clone, Serialize)]
pub struct MarketNewsRequest {
    pub lat: f64,
    pub lon: f64,
    pub query_mode: QueryMode,
    pub days: u32,
    pub max_results: u32,
}

/// Abstraction over the news/analysis backend
#[async_trait]
pub trait NewsBackend: Send + Sync {
    /// `GET /exchanges` - list all known stock exchanges
    async fn list_exchanges(&self) -> Result<Vec<Exchange>>;

    /// `POST /agent_fetch` - fetch annotated market news for a position
    async fn fetch_market_news(&self, request: &MarketNewsRequest) -> Result<Vec<NewsRecord>>;

    /// `GET /health` - backend liveness probe
    async fn health(&self) -> Result<bool>;

    /// `GET /history` - recent query history kept by the backend
    async fn history(&self, limit: u32) -> Result<Vec<Value>>;
}

#[derive(Debug, Deserialize)]
struct ExchangesEnvelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    exchanges: Vec<Exchange>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsEnvelope {
    #[serde(default)]
    ok: bool,
    data: Option<Vec<NewsRecord>>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    history: Vec<Value>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    status: String,
}

/// HTTP implementation of [`NewsBackend`] using `reqwest`
pub struct HttpNewsBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNewsBackend {
    pub fn new(config: &Config) -> Result<Self> {
        // Validate the origin up front so misconfiguration fails loudly
        let parsed = url::Url::parse(&config.backend_url)
            .map_err(|e| Error::Config(format!("Invalid backend URL: {}", e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::Config(
                "Backend URL must be http or https".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("Marketdesk/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Read a response body, mapping non-2xx statuses to a backend error that
    /// carries the status code and the raw body.
    async fn read_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::backend(Some(status.as_u16()), body));
        }
        Ok(body)
    }
}

#[async_trait]
impl NewsBackend for HttpNewsBackend {
    async fn list_exchanges(&self) -> Result<Vec<Exchange>> {
        let response = self.client.get(self.endpoint("exchanges")).send().await?;
        let body = Self::read_body(response).await?;

        let envelope: ExchangesEnvelope = serde_json::from_str(&body)?;
        if !envelope.ok {
            return Err(Error::backend(None, envelope.error.unwrap_or(body)));
        }
        Ok(envelope.exchanges)
    }

    async fn fetch_market_news(&self, request: &MarketNewsRequest) -> Result<Vec<NewsRecord>> {
        debug!(
            lat = request.lat,
            lon = request.lon,
            mode = %request.query_mode,
            "issuing market news fetch"
        );

        let response = self
            .client
            .post(self.endpoint("agent_fetch"))
            .json(request)
            .send()
            .await?;
        let body = Self::read_body(response).await?;

        let envelope: NewsEnvelope = serde_json::from_str(&body)?;
        if !envelope.ok {
            return Err(Error::backend(None, envelope.error.unwrap_or(body)));
        }
        Ok(envelope.data.unwrap_or_default())
    }

    async fn health(&self) -> Result<bool> {
        let response = self.client.get(self.endpoint("health")).send().await?;
        let body = Self::read_body(response).await?;
        let health: HealthResponse = serde_json::from_str(&body)?;
        Ok(health.status == "ok")
    }

    async fn history(&self, limit: u32) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(self.endpoint("history"))
            .query(&[("limit", limit)])
            .send()
            .await?;
        let body = Self::read_body(response).await?;

        let envelope: HistoryEnvelope = serde_json::from_str(&body)?;
        if !envelope.ok {
            return Err(Error::backend(None, envelope.error.unwrap_or(body)));
        }
        Ok(envelope.history)
    }
}
