//! Feed event and session-state types.

use chrono::{DateTime, Utc};

/// One security record as delivered by the backend.
///
/// The feed client passes record content through unmodified — field
/// interpretation (symbol, prices, volumes, timestamps) is left entirely to
/// consumers, so records are plain JSON values.
pub type QuoteRecord = serde_json::Value;

/// An event delivered to feed subscribers.
///
/// Subscribers see the same three event kinds regardless of which transport
/// is active (live WebSocket or polling fallback).
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A bulk snapshot or delta of security records.
    TradingData(Vec<QuoteRecord>),
    /// A single-security push update.
    StockUpdate(QuoteRecord),
    /// The connection went up (`true`) or down (`false`). Emitted only on
    /// actual change.
    ConnectionStatus(bool),
}

/// Connection lifecycle state of a [`FeedSession`](crate::feed::session::FeedSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport and no connection attempt in flight.
    Disconnected,
    /// Waiting on the login endpoint for a bearer token.
    Authenticating,
    /// Trying transport candidates in order.
    Probing,
    /// A transport is active (live or polling fallback).
    Connected,
    /// The live transport dropped; retrying with backoff.
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Authenticating => "authenticating",
            Self::Probing => "probing",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

/// How the session is currently delivering updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// A live transport won the probe and is streaming pushes.
    Live,
    /// No live transport was available; snapshots are polled over HTTP.
    Polling,
}

impl std::fmt::Display for FeedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Polling => f.write_str("polling"),
        }
    }
}

/// Diagnostic snapshot of a session.
#[derive(Debug, Clone)]
pub struct FeedStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Delivery mode, if connected.
    pub mode: Option<FeedMode>,
    /// Whether subscribers were last told the feed is up.
    pub connected: bool,
    /// Reconnection attempts made over the session's lifetime.
    pub reconnect_count: u64,
    /// When the current connection was established.
    pub connected_at: Option<DateTime<Utc>>,
}
