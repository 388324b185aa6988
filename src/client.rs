//! Core HTTP client for the trading backend's REST API.
//!
//! The [`FeedApiClient`] struct wraps [`reqwest::Client`] with bearer-token
//! authentication and provides typed `get` and `post` helpers.
//!
//! API endpoint methods are added to `FeedApiClient` via `impl` blocks in the
//! [`crate::api`] module.

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::constants::{DEFAULT_API_BASE_URL, ENV_API_BASE_URL};
use crate::error::{ApiErrorBody, FeedError, Result};

/// HTTP client for the trading backend's REST API.
///
/// Wraps [`reqwest::Client`] and injects a `Authorization: Bearer` header
/// into every request once a token has been obtained via
/// [`login`](crate::api::auth). The header value is cached when the token is
/// set to avoid per-request allocation.
///
/// # Example
///
/// ```no_run
/// use tradefeed_rs::client::FeedApiClient;
///
/// # #[tokio::main]
/// # async fn main() -> tradefeed_rs::error::Result<()> {
/// let client = FeedApiClient::new();
/// let snapshot = client.trading_status().await?;
/// println!("{} securities", snapshot.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FeedApiClient {
    http: reqwest::Client,
    /// Base URL for REST requests.
    base_url: String,
    /// Bearer token obtained from the login endpoint, if any.
    token: Option<String>,
    /// Pre-built `Authorization` header value, cached when the token is set.
    auth_header: Option<HeaderValue>,
}

impl FeedApiClient {
    /// Create a client using the configured base URL.
    ///
    /// Reads the `FEED_API_BASE_URL` environment variable, falling back to
    /// [`DEFAULT_API_BASE_URL`].
    pub fn new() -> Self {
        let base = std::env::var(ENV_API_BASE_URL)
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned());
        Self::with_base_url(base)
    }

    /// Create a client pointing at an explicit base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .default_headers(Self::default_headers())
            .build()
            .expect("failed to build reqwest client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: None,
            auth_header: None,
        }
    }

    /// Returns a reference to the underlying `reqwest::Client`.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the current bearer token, if one is held.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Install a bearer token for subsequent requests.
    pub fn set_token(&mut self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        let header = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| FeedError::InvalidArgument("token contains invalid header characters".into()))?;
        self.token = Some(token);
        self.auth_header = Some(header);
        Ok(())
    }

    /// Drop the bearer token. Subsequent requests go out unauthenticated.
    pub fn clear_token(&mut self) {
        self.token = None;
        self.auth_header = None;
    }

    // -----------------------------------------------------------------------
    // Generic HTTP helpers
    // -----------------------------------------------------------------------

    /// Perform a GET request and deserialize the JSON response.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");

        let resp = self
            .http
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        self.handle_response(resp).await
    }

    /// Perform a GET request and return the raw response body.
    ///
    /// Used by the polling fallback, which fingerprints the body before
    /// deciding whether to parse it.
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        tracing::debug!(%url, "GET (text)");

        let resp = self
            .http
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status.is_success() {
            Ok(body)
        } else {
            Err(self.parse_error_body(status, &body))
        }
    }

    /// Perform a POST request with a JSON body and deserialize the response.
    pub async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");

        let resp = self
            .http
            .post(&url)
            .headers(self.auth_headers())
            .json(body)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    /// Perform a POST request with an empty body and ignore the response body.
    pub async fn post_no_content(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        tracing::debug!(%url, "POST (no content)");

        let resp = self
            .http
            .post(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(self.parse_error_body(status, &body))
        }
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Build the full URL from a path segment.
    pub(crate) fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Default headers applied to every request.
    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Per-request auth headers. Uses the cached [`HeaderValue`] — only the
    /// [`HeaderMap`] container is allocated per call (no string parsing).
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(1);
        if let Some(ref auth) = self.auth_header {
            headers.insert(header::AUTHORIZATION, auth.clone());
        }
        headers
    }

    /// Read a response, returning either the deserialized body or a `FeedError`.
    ///
    /// Uses `bytes()` + `serde_json::from_slice()` to avoid the overhead of
    /// UTF-8 validation that `text()` + `from_str()` would incur.
    async fn handle_response<R: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<R> {
        let status = resp.status();
        let bytes = resp.bytes().await.unwrap_or_default();

        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(FeedError::Json)
        } else {
            let body = String::from_utf8_lossy(&bytes);
            Err(self.parse_error_body(status, &body))
        }
    }

    /// Try to parse the backend's JSON error envelope; fall back to a raw
    /// HTTP status error.
    pub(crate) fn parse_error_body(&self, status: reqwest::StatusCode, body: &str) -> FeedError {
        if let Ok(api_err) = serde_json::from_str::<ApiErrorBody>(body) {
            if api_err.message.is_some() || api_err.error.is_some() {
                return FeedError::Api(api_err);
            }
        }
        FeedError::HttpStatus {
            status,
            body: body.to_owned(),
        }
    }
}

impl Default for FeedApiClient {
    fn default() -> Self {
        Self::new()
    }
}
