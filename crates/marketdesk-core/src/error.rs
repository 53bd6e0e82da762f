//! Error types for Marketdesk Core

use thiserror::Error;

/// Result type alias using Marketdesk Error
pub type Result<T> = std::result::Result<T, Error>;

/// Marketdesk error types
#[derive(Error, Debug)]
pub enum Error {
    /// No geolocation capability is available in this session.
    #[error("Geolocation is not available")]
    CapabilityUnavailable,

    #[error("Invalid selection: {0}")]
    Validation(String),

    /// Non-success HTTP status or an `ok: false` payload from the backend.
    /// `status` is `None` for application-level failures carried in a 2xx body.
    #[error("{}", display_backend(.status, .message))]
    Backend {
        status: Option<u16>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a backend error from an HTTP status and response body.
    pub fn backend(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }
}

/// Status-aware rendering; the user sees both the code and the raw body
fn display_backend(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Backend error (HTTP {}): {}", code, message),
        None => format!("Backend error: {}", message),
    }
}
