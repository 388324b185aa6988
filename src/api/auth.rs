//! Login endpoint implementation.
//!
//! The backend's response envelope is inconsistent across deployments: the
//! token may live under `token`, `data.token`, `data.access_token`, or
//! `access_token`. [`extract_token`] normalizes those shapes in one place
//! with a fixed priority order instead of chaining optional-field checks at
//! every call site.

use serde_json::Value;

use crate::client::FeedApiClient;
use crate::constants::endpoints;
use crate::error::{FeedError, Result};
use crate::types::auth::{Credentials, LoginRequest};

/// Locate the bearer token in a login response body.
///
/// Checked in priority order: `token`, `data.token`, `data.access_token`,
/// `access_token`. Returns `None` when no string token is found under any of
/// those keys.
pub fn extract_token(body: &Value) -> Option<String> {
    let data = body.get("data");
    body.get("token")
        .or_else(|| data.and_then(|d| d.get("token")))
        .or_else(|| data.and_then(|d| d.get("access_token")))
        .or_else(|| body.get("access_token"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Pull the most useful human-readable message out of an envelope.
fn extract_message(body: &Value) -> Option<String> {
    body.get("message")
        .or_else(|| body.get("error"))
        .or_else(|| body.get("data").and_then(|d| d.get("message")))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Whether the envelope's logical `success` flag is set.
fn is_success(body: &Value) -> bool {
    body.get("success").and_then(Value::as_bool).unwrap_or(false)
}

impl FeedApiClient {
    /// Exchange credentials for a bearer token.
    ///
    /// **Endpoint:** `POST /user/login`
    ///
    /// A response counts as success only when the HTTP status is OK, the
    /// body's logical `success` flag is true, and a token can be located by
    /// [`extract_token`]. On success the token is installed on this client
    /// for subsequent requests and returned to the caller.
    ///
    /// Failures map to [`FeedError::Auth`] carrying the backend message when
    /// one is available, or a generic network-error text when the request
    /// itself failed. No retries are performed here — retry policy belongs to
    /// the caller.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<String> {
        if !credentials.is_complete() {
            return Err(FeedError::InvalidArgument(
                "username and password must be non-empty".into(),
            ));
        }

        let url = self.url(endpoints::LOGIN);
        tracing::debug!(%url, username = %credentials.username, "POST login");

        let resp = self
            .http()
            .post(&url)
            .json(&LoginRequest {
                username: &credentials.username,
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(|e| FeedError::Auth(format!("network error: {e}")))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|_| FeedError::Auth(format!("unparseable login response (HTTP {status})")))?;

        if !status.is_success() || !is_success(&parsed) {
            let msg = extract_message(&parsed)
                .unwrap_or_else(|| format!("login rejected (HTTP {status})"));
            return Err(FeedError::Auth(msg));
        }

        match extract_token(&parsed) {
            Some(token) => {
                self.set_token(&token)?;
                tracing::info!("authenticated against {}", self.base_url());
                Ok(token)
            }
            None => Err(FeedError::Auth(
                "login response contained no token under any known key".into(),
            )),
        }
    }
}
