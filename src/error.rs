//! Error types for the `tradefeed-rs` crate.
//!
//! All fallible operations in this crate return [`Result<T>`], which is an
//! alias for `std::result::Result<T, FeedError>`.
//!
//! [`FeedError`] covers:
//! - **Auth errors** — Credential rejection or network failure during login
//! - **Probe errors** — Every live-transport candidate failed
//! - **API errors** — Structured error envelopes from the backend
//! - **HTTP status errors** — Unexpected status codes with response body
//! - **HTTP transport errors** — Network, TLS, timeout failures
//! - **JSON errors** — Deserialization failures
//! - **WebSocket errors** — Connection and protocol errors
//! - **URL errors** — Malformed URL construction
//! - **Invalid arguments** — Client-side validation errors
//!
//! Failures on an already-established transport are deliberately *not* part
//! of this taxonomy: they reach subscribers only as a
//! `ConnectionStatus(false)` event, and individual polling-tick failures stay
//! internal to the poll loop.

use std::fmt;

/// Error envelope returned by the backend REST API.
///
/// The backend wraps logical failures in `{success: false, message: "..."}`,
/// though some endpoints use an `error` field instead.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiErrorBody {
    /// Logical success flag — `false` (or absent) on error responses.
    #[serde(default)]
    pub success: Option<bool>,
    /// Human-readable description of the error.
    #[serde(default)]
    pub message: Option<String>,
    /// Alternative error description field used by some endpoints.
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// The most specific message available in the envelope.
    pub fn detail(&self) -> &str {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("no message")
    }
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail())
    }
}

/// All possible errors produced by the `tradefeed-rs` client.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Login was rejected by the backend, or the login request itself failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Every transport candidate failed to open within its timeout.
    #[error("no live transport available ({attempted} candidates tried)")]
    ProbeExhausted {
        /// Number of candidates that were attempted.
        attempted: usize,
    },

    /// A structured error envelope returned by the backend REST API.
    #[error("API error: {0}")]
    Api(ApiErrorBody),

    /// The server returned an unexpected HTTP status code.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code.
        status: reqwest::StatusCode,
        /// The response body text.
        body: String,
    },

    /// A network or transport-level error from `reqwest`.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to deserialize a JSON response body.
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A WebSocket-level error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// An error building or parsing a URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The caller provided an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeedError>;
