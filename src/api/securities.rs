//! Securities endpoints: quote snapshots and push-pipeline hints.
//!
//! The hint endpoints (`start-socket`, `force-reconnect`) are best-effort —
//! call sites in the feed layer ignore their failures. The diagnostics
//! endpoints are informational only and not required for correctness.

use serde_json::Value;

use crate::client::FeedApiClient;
use crate::constants::endpoints;
use crate::error::Result;
use crate::types::feed::QuoteRecord;

impl FeedApiClient {
    /// Fetch the full quote snapshot for every security.
    ///
    /// **Endpoint:** `GET /securities/trading-status`
    ///
    /// Tolerates both a bare array body and a `{success, data: [...]}`
    /// envelope.
    pub async fn trading_status(&self) -> Result<Vec<QuoteRecord>> {
        let body: Value = self.get(endpoints::TRADING_STATUS).await?;
        Ok(snapshot_records(body))
    }

    /// Fetch the raw quote-snapshot body without parsing.
    ///
    /// The polling fallback fingerprints the raw text before deciding whether
    /// to parse and dispatch it.
    pub async fn trading_status_text(&self) -> Result<String> {
        self.get_text(endpoints::TRADING_STATUS).await
    }

    /// Hint the backend to arm its push pipeline. Best-effort.
    ///
    /// **Endpoint:** `POST /securities/start-socket`
    pub async fn start_socket(&self) -> Result<()> {
        self.post_no_content(endpoints::START_SOCKET).await
    }

    /// Hint the backend to cycle its push state. Best-effort.
    ///
    /// **Endpoint:** `POST /securities/force-reconnect`
    pub async fn force_reconnect(&self) -> Result<()> {
        self.post_no_content(endpoints::FORCE_RECONNECT).await
    }

    /// Backend-reported push diagnostics.
    ///
    /// **Endpoint:** `GET /securities/socket-status`
    pub async fn socket_status(&self) -> Result<Value> {
        self.get(endpoints::SOCKET_STATUS).await
    }

    /// Backend-reported push-connection diagnostics (alternative path).
    ///
    /// **Endpoint:** `GET /securities/socket-connection-status`
    pub async fn socket_connection_status(&self) -> Result<Value> {
        self.get(endpoints::SOCKET_CONNECTION_STATUS).await
    }
}

/// Extract the record array from a snapshot body, tolerating the envelope
/// variants the backend is known to produce.
pub(crate) fn snapshot_records(body: Value) -> Vec<QuoteRecord> {
    match body {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(records)) => records,
            Some(other) => vec![other],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}
