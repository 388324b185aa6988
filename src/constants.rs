//! Constants for the trading backend.
//!
//! Contains the REST base URL, endpoint paths, and the default timing values
//! used by the probe, reconnect, and polling layers. These are used internally
//! by [`FeedApiClient`](crate::client::FeedApiClient) and
//! [`FeedSession`](crate::feed::session::FeedSession), but are also exported
//! for advanced usage.

// ---------------------------------------------------------------------------
// Base URL
// ---------------------------------------------------------------------------

/// Default REST base URL, used when [`ENV_API_BASE_URL`] is not set.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Environment variable that overrides the REST base URL.
pub const ENV_API_BASE_URL: &str = "FEED_API_BASE_URL";

// ---------------------------------------------------------------------------
// REST endpoint paths
// ---------------------------------------------------------------------------

/// REST endpoint paths on the trading backend.
pub mod endpoints {
    /// Login — exchanges credentials for a bearer token.
    pub const LOGIN: &str = "/user/login";
    /// Full quote snapshot for every security.
    pub const TRADING_STATUS: &str = "/securities/trading-status";
    /// Best-effort hint for the backend to arm its push pipeline.
    pub const START_SOCKET: &str = "/securities/start-socket";
    /// Backend-reported push-connection diagnostics.
    pub const SOCKET_STATUS: &str = "/securities/socket-status";
    /// Alternative diagnostics path used by some deployments.
    pub const SOCKET_CONNECTION_STATUS: &str = "/securities/socket-connection-status";
    /// Best-effort hint for the backend to cycle its push state.
    pub const FORCE_RECONNECT: &str = "/securities/force-reconnect";
}

// ---------------------------------------------------------------------------
// Timing defaults
// ---------------------------------------------------------------------------

/// Default timing values for the probe, reconnect, and polling layers.
pub mod timing {
    /// How long each transport candidate gets to open before the probe
    /// advances to the next one.
    pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;

    /// Polling-fallback snapshot interval. Chosen to approximate live-feed
    /// latency without overloading the backend.
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

    /// Initial reconnect delay after an unexpected transport drop.
    pub const DEFAULT_RECONNECT_INITIAL_DELAY_MS: u64 = 500;

    /// Cap on the exponential reconnect delay.
    pub const DEFAULT_RECONNECT_MAX_DELAY_MS: u64 = 8_000;

    /// Reconnect attempts before giving up (and falling back to polling when
    /// configured).
    pub const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 5;
}

/// Default capacity of the broadcast channel carrying feed events.
pub const EVENT_CHANNEL_CAPACITY: usize = 1_024;
