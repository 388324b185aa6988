//! Transport candidates.
//!
//! Backend infrastructure (reverse-proxy path rewriting, socket.io-vs-plain
//! WebSocket support) is not reliably knowable ahead of time, so the client
//! carries an ordered list of concrete configurations and discovers a working
//! one empirically. The list is rebuilt on every `connect()` call because the
//! base URL can change with environment configuration.

use std::time::Duration;

use url::Url;

use crate::error::Result;

/// How the bearer token is presented to a transport endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Token appended as a `token=` query parameter on the connection URL.
    Query,
    /// Token sent as a JSON auth message immediately after the socket opens.
    Payload,
    /// No token presented at all.
    None,
}

/// One concrete (URL, auth-mode, timeout) configuration to try when
/// establishing a live connection.
#[derive(Debug, Clone)]
pub struct TransportCandidate {
    /// Short name used in logs.
    pub name: String,
    /// Fully-formed connection URL, before any token query parameter.
    pub url: Url,
    /// How the token is presented on this candidate.
    pub auth: AuthMode,
    /// How long this candidate gets to open before the probe advances.
    pub timeout: Duration,
}

impl TransportCandidate {
    /// Build a candidate from a ws(s) base URL and a path.
    fn new(
        name: &str,
        ws_base: &Url,
        path: &str,
        query: Option<&str>,
        auth: AuthMode,
        timeout: Duration,
    ) -> Result<Self> {
        let mut url = ws_base.clone();
        url.set_path(path);
        url.set_query(query);
        Ok(Self {
            name: name.to_owned(),
            url,
            auth,
            timeout,
        })
    }
}

/// Engine.io handshake query used by socket.io-style endpoints when the
/// client speaks the raw WebSocket transport directly.
const SOCKETIO_QUERY: &str = "EIO=4&transport=websocket";

/// Compute the ordered candidate list for a REST base URL.
///
/// The scheme is mapped http→ws / https→wss and any REST path prefix (e.g.
/// `/api`) is dropped — transport endpoints are mounted at the host root.
/// Candidates are tried strictly in the returned order.
pub fn default_candidates(base_url: &str, timeout: Duration) -> Result<Vec<TransportCandidate>> {
    let mut ws_base = Url::parse(base_url)?;
    let scheme = match ws_base.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    // Url::set_scheme rejects some cross-scheme changes; rebuild instead.
    let host = ws_base.host_str().unwrap_or("localhost").to_owned();
    let port = ws_base.port();
    ws_base = Url::parse(&match port {
        Some(p) => format!("{scheme}://{host}:{p}"),
        None => format!("{scheme}://{host}"),
    })?;

    Ok(vec![
        TransportCandidate::new(
            "socketio-apitest",
            &ws_base,
            "/apitest/socket/",
            Some(SOCKETIO_QUERY),
            AuthMode::Query,
            timeout,
        )?,
        TransportCandidate::new(
            "socketio-default",
            &ws_base,
            "/socket.io/",
            Some(SOCKETIO_QUERY),
            AuthMode::Query,
            timeout,
        )?,
        TransportCandidate::new("ws", &ws_base, "/ws", None, AuthMode::Query, timeout)?,
        TransportCandidate::new(
            "securities-ws",
            &ws_base,
            "/securities/ws",
            None,
            AuthMode::Payload,
            timeout,
        )?,
        TransportCandidate::new(
            "websocket",
            &ws_base,
            "/websocket",
            None,
            AuthMode::None,
            timeout,
        )?,
    ])
}
