//! Connection session: the one owner of the live feed.
//!
//! A [`FeedSession`] holds at most one active transport, drives the
//! authenticate → probe → connect sequence, forwards every inbound message
//! through the dispatcher to a broadcast channel, and applies the
//! reconnection policy when the transport drops. When no live transport can
//! be established (at connect time or after reconnection gives up) and
//! fallback is enabled, the session degrades to HTTP polling feeding the same
//! event contract, so subscribers stay transport-agnostic.
//!
//! Construct one session per application and hand out event receivers —
//! there are no globals here.
//!
//! # Example
//!
//! ```no_run
//! use tradefeed_rs::client::FeedApiClient;
//! use tradefeed_rs::feed::session::FeedSession;
//! use tradefeed_rs::types::auth::Credentials;
//! use tradefeed_rs::types::feed::FeedEvent;
//!
//! # #[tokio::main]
//! # async fn main() -> tradefeed_rs::error::Result<()> {
//! let api = FeedApiClient::new();
//! let mut session = FeedSession::new(api, Credentials::demo());
//!
//! let mode = session.connect().await?;
//! println!("connected in {mode} mode");
//! session.join_trading_room().await?;
//!
//! let mut events = session.events();
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         FeedEvent::TradingData(records) => println!("{} records", records.len()),
//!         FeedEvent::StockUpdate(record) => println!("update: {record}"),
//!         FeedEvent::ConnectionStatus(up) => println!("connection: {up}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use crate::client::FeedApiClient;
use crate::constants::{EVENT_CHANNEL_CAPACITY, timing};
use crate::error::Result;
use crate::feed::candidate::default_candidates;
use crate::feed::dispatch::normalize;
use crate::feed::polling::run_polling;
use crate::feed::probe::probe;
use crate::feed::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::feed::transport::{TransportDialer, TransportSink, TransportStream, WsDialer};
use crate::types::auth::Credentials;
use crate::types::feed::{ConnectionState, FeedEvent, FeedMode, FeedStatus};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`FeedSession`].
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Per-candidate probe timeout.
    pub probe_timeout: Duration,
    /// Polling-fallback snapshot interval.
    pub poll_interval: Duration,
    /// Reconnection backoff after an unexpected transport drop.
    pub reconnect: ReconnectConfig,
    /// Whether to degrade to HTTP polling when no live transport is
    /// available.
    pub fallback_to_polling: bool,
    /// Broadcast channel capacity for feed events.
    pub event_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(timing::DEFAULT_PROBE_TIMEOUT_MS),
            poll_interval: Duration::from_millis(timing::DEFAULT_POLL_INTERVAL_MS),
            reconnect: ReconnectConfig::default(),
            fallback_to_polling: true,
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`FeedSession`] with custom configuration.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use tradefeed_rs::client::FeedApiClient;
/// use tradefeed_rs::feed::session::FeedSessionBuilder;
/// use tradefeed_rs::types::auth::Credentials;
///
/// let session = FeedSessionBuilder::new(FeedApiClient::new(), Credentials::demo())
///     .probe_timeout(Duration::from_secs(1))
///     .fallback_to_polling(false)
///     .build();
/// ```
pub struct FeedSessionBuilder {
    api: FeedApiClient,
    credentials: Credentials,
    config: FeedConfig,
    dialer: Arc<dyn TransportDialer>,
}

impl FeedSessionBuilder {
    /// Create a new builder with the given API client and credentials.
    pub fn new(api: FeedApiClient, credentials: Credentials) -> Self {
        Self {
            api,
            credentials,
            config: FeedConfig::default(),
            dialer: Arc::new(WsDialer),
        }
    }

    /// Set the per-candidate probe timeout. Default: 3 s.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Set the polling-fallback interval. Default: 3 s.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the reconnection backoff configuration.
    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.config.reconnect = reconnect;
        self
    }

    /// Enable or disable the polling fallback. Default: enabled.
    pub fn fallback_to_polling(mut self, enable: bool) -> Self {
        self.config.fallback_to_polling = enable;
        self
    }

    /// Set the broadcast channel capacity for feed events. Default: 1,024.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Swap in a custom transport dialer. Default: [`WsDialer`].
    ///
    /// This is the seam tests use to inject mock transports.
    pub fn dialer(mut self, dialer: Arc<dyn TransportDialer>) -> Self {
        self.dialer = dialer;
        self
    }

    /// Build the [`FeedSession`].
    pub fn build(self) -> FeedSession {
        FeedSession::with_config(self.api, self.credentials, self.config, self.dialer)
    }
}

// ---------------------------------------------------------------------------
// Shared task state
// ---------------------------------------------------------------------------

/// State shared between the session handle and its background tasks.
struct Shared {
    /// Encoded [`ConnectionState`].
    state: AtomicU8,
    /// Encoded `Option<FeedMode>` (0 = none).
    mode: AtomicU8,
    /// Whether subscribers were last told the feed is up.
    connected: AtomicBool,
    /// Reconnection attempts made over the session's lifetime.
    reconnect_count: AtomicU64,
    /// Epoch millis of the current connection, 0 when down.
    connected_at_ms: AtomicI64,
}

const MODE_NONE: u8 = 0;
const MODE_LIVE: u8 = 1;
const MODE_POLLING: u8 = 2;

impl Shared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(encode_state(ConnectionState::Disconnected)),
            mode: AtomicU8::new(MODE_NONE),
            connected: AtomicBool::new(false),
            reconnect_count: AtomicU64::new(0),
            connected_at_ms: AtomicI64::new(0),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(encode_state(state), Ordering::SeqCst);
        tracing::debug!(%state, "session state");
    }

    fn state(&self) -> ConnectionState {
        decode_state(self.state.load(Ordering::SeqCst))
    }

    fn set_mode(&self, mode: Option<FeedMode>) {
        let raw = match mode {
            None => MODE_NONE,
            Some(FeedMode::Live) => MODE_LIVE,
            Some(FeedMode::Polling) => MODE_POLLING,
        };
        self.mode.store(raw, Ordering::SeqCst);
    }

    fn mode(&self) -> Option<FeedMode> {
        match self.mode.load(Ordering::SeqCst) {
            MODE_LIVE => Some(FeedMode::Live),
            MODE_POLLING => Some(FeedMode::Polling),
            _ => None,
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Flip the connected flag, notifying subscribers only on actual change.
    fn set_connected(&self, up: bool, events_tx: &broadcast::Sender<FeedEvent>) {
        if self.connected.swap(up, Ordering::SeqCst) != up {
            let stamp = if up { Utc::now().timestamp_millis() } else { 0 };
            self.connected_at_ms.store(stamp, Ordering::SeqCst);
            let _ = events_tx.send(FeedEvent::ConnectionStatus(up));
        }
    }

    fn connected_at(&self) -> Option<DateTime<Utc>> {
        match self.connected_at_ms.load(Ordering::SeqCst) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }
}

fn encode_state(state: ConnectionState) -> u8 {
    match state {
        ConnectionState::Disconnected => 0,
        ConnectionState::Authenticating => 1,
        ConnectionState::Probing => 2,
        ConnectionState::Connected => 3,
        ConnectionState::Reconnecting => 4,
    }
}

fn decode_state(raw: u8) -> ConnectionState {
    match raw {
        1 => ConnectionState::Authenticating,
        2 => ConnectionState::Probing,
        3 => ConnectionState::Connected,
        4 => ConnectionState::Reconnecting,
        _ => ConnectionState::Disconnected,
    }
}

type SharedWriter = Arc<Mutex<Option<Box<dyn TransportSink>>>>;

// ---------------------------------------------------------------------------
// FeedSession
// ---------------------------------------------------------------------------

/// One live-feed session: token, transport, and subscribers.
///
/// The bearer token and the active transport handle are private to one
/// session instance; the design assumes exactly one session per application.
/// Use [`FeedSessionBuilder`] for custom configuration.
pub struct FeedSession {
    api: FeedApiClient,
    credentials: Credentials,
    config: FeedConfig,
    dialer: Arc<dyn TransportDialer>,
    shared: Arc<Shared>,
    events_tx: broadcast::Sender<FeedEvent>,
    writer: SharedWriter,
    reader_task: Option<JoinHandle<()>>,
    poll_task: Option<JoinHandle<()>>,
}

impl FeedSession {
    /// Create a session with default configuration and the WebSocket dialer.
    pub fn new(api: FeedApiClient, credentials: Credentials) -> Self {
        Self::with_config(api, credentials, FeedConfig::default(), Arc::new(WsDialer))
    }

    fn with_config(
        api: FeedApiClient,
        credentials: Credentials,
        config: FeedConfig,
        dialer: Arc<dyn TransportDialer>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(config.event_capacity);
        Self {
            api,
            credentials,
            config,
            dialer,
            shared: Arc::new(Shared::new()),
            events_tx,
            writer: Arc::new(Mutex::new(None)),
            reader_task: None,
            poll_task: None,
        }
    }

    /// Subscribe to feed events.
    ///
    /// Any number of receivers may exist at once; dropping a receiver
    /// unsubscribes it.
    pub fn events(&self) -> broadcast::Receiver<FeedEvent> {
        self.events_tx.subscribe()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Current delivery mode, if connected.
    pub fn mode(&self) -> Option<FeedMode> {
        self.shared.mode()
    }

    /// Diagnostic snapshot of the session.
    pub fn status(&self) -> FeedStatus {
        FeedStatus {
            state: self.shared.state(),
            mode: self.shared.mode(),
            connected: self.shared.is_connected(),
            reconnect_count: self.shared.reconnect_count.load(Ordering::SeqCst),
            connected_at: self.shared.connected_at(),
        }
    }

    /// Establish the feed: authenticate (unless a token is already held),
    /// probe the transport candidates, and either go live or fall back to
    /// polling.
    ///
    /// Calling this while already connected is a no-op returning the current
    /// mode. A token obtained by an earlier call is reused — no second login
    /// is issued until [`disconnect`](Self::disconnect) clears it.
    pub async fn connect(&mut self) -> Result<FeedMode> {
        if let Some(mode) = self.shared.mode() {
            tracing::debug!(%mode, "connect() while already connected");
            return Ok(mode);
        }

        if self.api.token().is_none() {
            self.shared.set_state(ConnectionState::Authenticating);
            if let Err(e) = self.api.login(&self.credentials).await {
                self.shared.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        }

        self.shared.set_state(ConnectionState::Probing);
        let candidates = default_candidates(self.api.base_url(), self.config.probe_timeout)?;

        match probe(self.dialer.as_ref(), &candidates, self.api.token()).await {
            Ok(active) => {
                tracing::info!(candidate = %active.candidate_name, "live feed established");
                *self.writer.lock().await = Some(active.sink);
                self.shared.set_state(ConnectionState::Connected);
                self.shared.set_mode(Some(FeedMode::Live));
                self.shared.set_connected(true, &self.events_tx);

                let ctx = ReaderContext {
                    writer: self.writer.clone(),
                    events_tx: self.events_tx.clone(),
                    shared: self.shared.clone(),
                    dialer: self.dialer.clone(),
                    api: self.api.clone(),
                    probe_timeout: self.config.probe_timeout,
                    reconnect: self.config.reconnect.clone(),
                    fallback_to_polling: self.config.fallback_to_polling,
                    poll_interval: self.config.poll_interval,
                };
                self.reader_task = Some(tokio::spawn(run_reader(ctx, active.stream)));
                Ok(FeedMode::Live)
            }
            Err(e) if self.config.fallback_to_polling => {
                tracing::warn!(error = %e, "no live transport — falling back to polling");
                self.shared.set_state(ConnectionState::Connected);
                self.shared.set_mode(Some(FeedMode::Polling));
                self.shared.set_connected(true, &self.events_tx);
                self.poll_task = Some(tokio::spawn(run_polling(
                    self.api.clone(),
                    self.config.poll_interval,
                    self.events_tx.clone(),
                )));
                Ok(FeedMode::Polling)
            }
            Err(e) => {
                self.shared.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Subscribe to the trading room on the active transport.
    ///
    /// No-op with a warning when not connected or when running on the polling
    /// fallback (which has no transport to send on).
    pub async fn join_trading_room(&self) -> Result<()> {
        if !self.shared.is_connected() {
            tracing::warn!("join_trading_room() while not connected — ignored");
            return Ok(());
        }

        let mut guard = self.writer.lock().await;
        match guard.as_mut() {
            Some(sink) => {
                let msg = json!({ "type": "join-room", "room": "trading" });
                sink.send_text(msg.to_string()).await?;
                tracing::debug!("joined trading room");
                Ok(())
            }
            None => {
                tracing::warn!("join_trading_room() in polling mode — ignored");
                Ok(())
            }
        }
    }

    /// Tear the session down: close the transport, stop polling, clear the
    /// token, and notify subscribers (once) that the feed is down.
    ///
    /// Safe to call when already disconnected.
    pub async fn disconnect(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }

        let mut guard = self.writer.lock().await;
        if let Some(mut sink) = guard.take() {
            if let Err(e) = sink.close().await {
                tracing::debug!(error = %e, "close frame failed");
            }
        }
        drop(guard);

        self.api.clear_token();
        self.shared.set_mode(None);
        self.shared.set_state(ConnectionState::Disconnected);
        self.shared.set_connected(false, &self.events_tx);

        tracing::info!("session disconnected");
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Reader task
// ---------------------------------------------------------------------------

/// Everything the background reader needs to keep the feed alive.
struct ReaderContext {
    writer: SharedWriter,
    events_tx: broadcast::Sender<FeedEvent>,
    shared: Arc<Shared>,
    dialer: Arc<dyn TransportDialer>,
    api: FeedApiClient,
    probe_timeout: Duration,
    reconnect: ReconnectConfig,
    fallback_to_polling: bool,
    poll_interval: Duration,
}

/// Pump inbound messages to subscribers; on an unexpected drop, re-probe with
/// backoff and, if that fails too, hand over to the polling fallback.
async fn run_reader(ctx: ReaderContext, mut stream: Box<dyn TransportStream>) {
    loop {
        while let Some(item) = stream.next_message().await {
            match item {
                Ok(value) => {
                    if let Some(event) = normalize(value) {
                        let _ = ctx.events_tx.send(event);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "transport error");
                    break;
                }
            }
        }

        // Transport dropped without a disconnect() call.
        *ctx.writer.lock().await = None;
        ctx.shared.set_state(ConnectionState::Reconnecting);
        ctx.shared.set_connected(false, &ctx.events_tx);

        match reconnect(&ctx).await {
            Some(transport) => {
                tracing::info!(candidate = %transport.candidate_name, "reconnected");
                *ctx.writer.lock().await = Some(transport.sink);
                stream = transport.stream;
                ctx.shared.set_state(ConnectionState::Connected);
                ctx.shared.set_mode(Some(FeedMode::Live));
                ctx.shared.set_connected(true, &ctx.events_tx);
            }
            None if ctx.fallback_to_polling => {
                tracing::warn!("reconnection exhausted — falling back to polling");
                ctx.shared.set_state(ConnectionState::Connected);
                ctx.shared.set_mode(Some(FeedMode::Polling));
                ctx.shared.set_connected(true, &ctx.events_tx);
                run_polling(ctx.api.clone(), ctx.poll_interval, ctx.events_tx.clone()).await;
                return;
            }
            None => {
                tracing::warn!("reconnection exhausted — giving up");
                ctx.shared.set_state(ConnectionState::Disconnected);
                ctx.shared.set_mode(None);
                return;
            }
        }
    }
}

/// Re-probe the candidate list with capped exponential backoff.
async fn reconnect(ctx: &ReaderContext) -> Option<crate::feed::transport::ActiveTransport> {
    let mut policy = ReconnectPolicy::new(ctx.reconnect.clone());

    while let Some(delay) = policy.next_delay() {
        tokio::time::sleep(delay).await;
        ctx.shared.reconnect_count.fetch_add(1, Ordering::SeqCst);

        let candidates = match default_candidates(ctx.api.base_url(), ctx.probe_timeout) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(error = %e, "cannot rebuild candidate list");
                return None;
            }
        };

        match probe(ctx.dialer.as_ref(), &candidates, ctx.api.token()).await {
            Ok(transport) => return Some(transport),
            Err(e) => {
                tracing::warn!(
                    attempt = policy.attempts(),
                    error = %e,
                    "reconnect attempt failed"
                );
            }
        }
    }
    None
}
