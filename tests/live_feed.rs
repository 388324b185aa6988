//! Async integration tests: probing against scripted dialers, login and
//! polling against a mock HTTP backend (wiremock), the session pump against
//! channel-backed mock transports, and the WebSocket dialer against an
//! in-process tokio-tungstenite server.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tradefeed_rs::client::FeedApiClient;
use tradefeed_rs::error::{FeedError, Result};
use tradefeed_rs::feed::candidate::{AuthMode, TransportCandidate};
use tradefeed_rs::feed::probe::probe;
use tradefeed_rs::feed::reconnect::ReconnectConfig;
use tradefeed_rs::feed::session::FeedSessionBuilder;
use tradefeed_rs::feed::transport::{
    ActiveTransport, TransportDialer, TransportSink, TransportStream, WsDialer,
};
use tradefeed_rs::types::auth::Credentials;
use tradefeed_rs::types::feed::{ConnectionState, FeedEvent, FeedMode};

// ===================================================================
// Mock transports and dialers
// ===================================================================

/// Sink that records every sent frame into a shared log.
struct RecordingSink {
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl TransportSink for RecordingSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Stream fed from a test-controlled channel; yields `None` once the sender
/// is dropped, emulating a server-side close.
struct ChannelStream {
    rx: mpsc::UnboundedReceiver<Value>,
}

#[async_trait]
impl TransportStream for ChannelStream {
    async fn next_message(&mut self) -> Option<Result<Value>> {
        self.rx.recv().await.map(Ok)
    }
}

/// Stream that never yields; used where probe tests only care about opening.
struct PendingStream;

#[async_trait]
impl TransportStream for PendingStream {
    async fn next_message(&mut self) -> Option<Result<Value>> {
        std::future::pending().await
    }
}

fn idle_transport(name: &str) -> ActiveTransport {
    ActiveTransport {
        candidate_name: name.to_owned(),
        sink: Box::new(RecordingSink {
            sent: Arc::new(Mutex::new(Vec::new())),
        }),
        stream: Box::new(PendingStream),
    }
}

/// Build a transport whose inbound messages the test controls and whose
/// outbound frames it can inspect.
fn scripted_transport(
    name: &str,
) -> (ActiveTransport, mpsc::UnboundedSender<Value>, Arc<Mutex<Vec<String>>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let transport = ActiveTransport {
        candidate_name: name.to_owned(),
        sink: Box::new(RecordingSink { sent: sent.clone() }),
        stream: Box::new(ChannelStream { rx }),
    };
    (transport, tx, sent)
}

/// Per-candidate dial behavior.
#[derive(Clone, Copy)]
enum Behavior {
    /// Fail immediately.
    FailFast,
    /// Never resolve — the probe's timeout must advance past it.
    Hang,
    /// Open successfully after a delay.
    SucceedAfter(Duration),
}

/// Dialer whose behavior is keyed by candidate name; unknown names fail fast.
/// Records the order candidates were attempted in.
struct MapDialer {
    attempts: Arc<Mutex<Vec<String>>>,
    behaviors: HashMap<String, Behavior>,
}

impl MapDialer {
    fn new(behaviors: &[(&str, Behavior)]) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(Vec::new())),
            behaviors: behaviors
                .iter()
                .map(|(name, b)| ((*name).to_owned(), *b))
                .collect(),
        }
    }

    fn attempted(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportDialer for MapDialer {
    async fn dial(
        &self,
        candidate: &TransportCandidate,
        _token: Option<&str>,
    ) -> Result<ActiveTransport> {
        self.attempts.lock().unwrap().push(candidate.name.clone());
        match self
            .behaviors
            .get(&candidate.name)
            .copied()
            .unwrap_or(Behavior::FailFast)
        {
            Behavior::FailFast => Err(FeedError::InvalidArgument("mock dial failure".into())),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Behavior::SucceedAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(idle_transport(&candidate.name))
            }
        }
    }
}

/// Dialer that hands out pre-built transports in order; once the queue is
/// empty every dial fails.
struct QueueDialer {
    outcomes: Mutex<VecDeque<ActiveTransport>>,
}

impl QueueDialer {
    fn new(transports: Vec<ActiveTransport>) -> Self {
        Self {
            outcomes: Mutex::new(transports.into()),
        }
    }
}

#[async_trait]
impl TransportDialer for QueueDialer {
    async fn dial(
        &self,
        _candidate: &TransportCandidate,
        _token: Option<&str>,
    ) -> Result<ActiveTransport> {
        match self.outcomes.lock().unwrap().pop_front() {
            Some(transport) => Ok(transport),
            None => Err(FeedError::InvalidArgument("mock dial failure".into())),
        }
    }
}

fn mock_candidates(names: &[&str], timeout: Duration) -> Vec<TransportCandidate> {
    names
        .iter()
        .map(|name| TransportCandidate {
            name: (*name).to_owned(),
            url: url::Url::parse("ws://127.0.0.1:9/feed").unwrap(),
            auth: AuthMode::None,
            timeout,
        })
        .collect()
}

/// Receive the next event or panic after five (real) seconds.
async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<FeedEvent>) -> FeedEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Tight reconnect schedule so tests don't sit in backoff sleeps.
fn fast_reconnect(max_attempts: u32) -> ReconnectConfig {
    ReconnectConfig {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        max_attempts,
    }
}

// ===================================================================
// Probe (P1, P2, Scenario B)
// ===================================================================

#[tokio::test]
async fn probe_tries_candidates_in_order_and_stops_at_winner() {
    let dialer = MapDialer::new(&[
        ("c1", Behavior::FailFast),
        ("c2", Behavior::FailFast),
        ("c3", Behavior::SucceedAfter(Duration::ZERO)),
        ("c4", Behavior::SucceedAfter(Duration::ZERO)),
    ]);
    let candidates = mock_candidates(&["c1", "c2", "c3", "c4"], Duration::from_millis(100));

    let transport = probe(&dialer, &candidates, Some("tok")).await.unwrap();

    assert_eq!(transport.candidate_name, "c3");
    // c4 must never be attempted once c3 wins.
    assert_eq!(dialer.attempted(), ["c1", "c2", "c3"]);
}

#[tokio::test(start_paused = true)]
async fn probe_advances_past_a_candidate_that_never_calls_back() {
    let dialer = MapDialer::new(&[
        ("hung", Behavior::Hang),
        ("good", Behavior::SucceedAfter(Duration::ZERO)),
    ]);
    let candidates = mock_candidates(&["hung", "good"], Duration::from_secs(3));

    let transport = probe(&dialer, &candidates, None).await.unwrap();

    assert_eq!(transport.candidate_name, "good");
    assert_eq!(dialer.attempted(), ["hung", "good"]);
}

#[tokio::test(start_paused = true)]
async fn probe_timing_with_hung_then_slow_candidate() {
    // One candidate burns its full 3 s timeout, one fails instantly, the
    // winner opens 50 ms in: the probe resolves in ≈3050 ms, not less and
    // not much more.
    let dialer = MapDialer::new(&[
        ("hung", Behavior::Hang),
        ("dead", Behavior::FailFast),
        ("slow", Behavior::SucceedAfter(Duration::from_millis(50))),
    ]);
    let candidates = mock_candidates(&["hung", "dead", "slow"], Duration::from_secs(3));

    let start = tokio::time::Instant::now();
    let transport = probe(&dialer, &candidates, None).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(transport.candidate_name, "slow");
    assert!(elapsed >= Duration::from_millis(3_050), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3_150), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn probe_exhaustion_yields_one_uniform_error() {
    let dialer = MapDialer::new(&[]);
    let candidates = mock_candidates(&["a", "b", "c"], Duration::from_millis(50));

    let err = probe(&dialer, &candidates, None).await.unwrap_err();

    match err {
        FeedError::ProbeExhausted { attempted } => assert_eq!(attempted, 3),
        other => panic!("expected ProbeExhausted, got {other:?}"),
    }
    assert_eq!(dialer.attempted(), ["a", "b", "c"]);
}

// ===================================================================
// Login (Scenario A) and token reuse (P3)
// ===================================================================

#[tokio::test]
async fn login_resolves_token_from_nested_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "token": "abc" }
            })),
        )
        .mount(&server)
        .await;

    let mut client = FeedApiClient::with_base_url(server.uri());
    let token = client.login(&Credentials::demo()).await.unwrap();

    assert_eq!(token, "abc");
    assert_eq!(client.token(), Some("abc"));
}

#[tokio::test]
async fn login_rejection_carries_the_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Invalid credentials"
        })))
        .mount(&server)
        .await;

    let mut client = FeedApiClient::with_base_url(server.uri());
    let err = client.login(&Credentials::new("bad", "creds")).await.unwrap_err();

    match err {
        FeedError::Auth(msg) => assert!(msg.contains("Invalid credentials"), "msg: {msg}"),
        other => panic!("expected Auth, got {other:?}"),
    }
    assert_eq!(client.token(), None);
}

#[tokio::test]
async fn login_rejects_empty_credentials_without_a_request() {
    let mut client = FeedApiClient::with_base_url("http://127.0.0.1:9");
    let err = client.login(&Credentials::new("", "")).await.unwrap_err();
    assert!(matches!(err, FeedError::InvalidArgument(_)));
}

#[tokio::test]
async fn second_connect_reuses_the_held_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "token": "once" })),
        )
        .expect(1) // the whole point: exactly one login
        .mount(&server)
        .await;

    let api = FeedApiClient::with_base_url(server.uri());
    let mut session = FeedSessionBuilder::new(api, Credentials::demo())
        .dialer(Arc::new(MapDialer::new(&[])))
        .probe_timeout(Duration::from_millis(20))
        .fallback_to_polling(false)
        .build();

    assert!(matches!(
        session.connect().await,
        Err(FeedError::ProbeExhausted { .. })
    ));
    // No disconnect in between: the token must be reused, not re-fetched.
    assert!(matches!(
        session.connect().await,
        Err(FeedError::ProbeExhausted { .. })
    ));

    server.verify().await;
}

// ===================================================================
// Polling fallback (P4, Scenario C)
// ===================================================================

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "token": "poll-token" })),
        )
        .mount(server)
        .await;
}

async fn mount_socket_hints(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/securities/force-reconnect"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/securities/start-socket"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[tokio::test]
async fn polling_fallback_fires_only_when_the_snapshot_changes() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_socket_hints(&server).await;

    // Snapshot sequence over ticks: h1, h1, h2, h2, h2, ...
    Mock::given(method("GET"))
        .and(path("/securities/trading-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{ "symbol": "AAPL", "price": 1 }]
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/securities/trading-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{ "symbol": "AAPL", "price": 2 }]
        })))
        .mount(&server)
        .await;

    let api = FeedApiClient::with_base_url(server.uri());
    let mut session = FeedSessionBuilder::new(api, Credentials::demo())
        .dialer(Arc::new(MapDialer::new(&[])))
        .probe_timeout(Duration::from_millis(10))
        .poll_interval(Duration::from_millis(25))
        .build();
    let mut events = session.events();

    let mode = session.connect().await.unwrap();
    assert_eq!(mode, FeedMode::Polling);
    assert_eq!(session.state(), ConnectionState::Connected);
    assert_eq!(session.mode(), Some(FeedMode::Polling));

    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(true)));

    // Exactly two data emissions: the first snapshot and the changed one.
    let first = next_event(&mut events).await;
    match first {
        FeedEvent::TradingData(records) => assert_eq!(records[0]["price"], 1),
        other => panic!("expected TradingData, got {other:?}"),
    }
    let second = next_event(&mut events).await;
    match second {
        FeedEvent::TradingData(records) => assert_eq!(records[0]["price"], 2),
        other => panic!("expected TradingData, got {other:?}"),
    }

    // The snapshot stays h2 from here on: several more ticks, no more events.
    let extra = tokio::time::timeout(Duration::from_millis(200), events.recv()).await;
    assert!(extra.is_err(), "unexpected extra event: {extra:?}");

    session.disconnect().await;
}

#[tokio::test]
async fn failed_poll_ticks_are_skipped_silently() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    // No trading-status mock: every tick 404s. The poller must keep going
    // and emit nothing but the initial status event.

    let api = FeedApiClient::with_base_url(server.uri());
    let mut session = FeedSessionBuilder::new(api, Credentials::demo())
        .dialer(Arc::new(MapDialer::new(&[])))
        .probe_timeout(Duration::from_millis(10))
        .poll_interval(Duration::from_millis(20))
        .build();
    let mut events = session.events();

    assert_eq!(session.connect().await.unwrap(), FeedMode::Polling);
    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(true)));

    let extra = tokio::time::timeout(Duration::from_millis(150), events.recv()).await;
    assert!(extra.is_err(), "unexpected event from failing ticks: {extra:?}");

    session.disconnect().await;
}

// ===================================================================
// Disconnect idempotence (P5)
// ===================================================================

#[tokio::test]
async fn disconnect_is_idempotent_and_notifies_only_on_change() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let api = FeedApiClient::with_base_url(server.uri());
    let mut session = FeedSessionBuilder::new(api, Credentials::demo())
        .dialer(Arc::new(MapDialer::new(&[])))
        .probe_timeout(Duration::from_millis(10))
        .poll_interval(Duration::from_millis(50))
        .build();
    let mut events = session.events();

    // Disconnecting a never-connected session is safe and emits nothing.
    session.disconnect().await;
    session.disconnect().await;
    assert!(events.try_recv().is_err());
    assert_eq!(session.state(), ConnectionState::Disconnected);

    // Full cycle: up once, down once, and a second disconnect adds nothing.
    session.connect().await.unwrap();
    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(true)));

    session.disconnect().await;
    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(false)));
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(session.mode(), None);

    session.disconnect().await;
    let extra = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
    assert!(extra.is_err(), "second disconnect re-notified: {extra:?}");
}

// ===================================================================
// Session pump, join-room, reconnection
// ===================================================================

#[tokio::test]
async fn live_session_pumps_messages_and_joins_the_trading_room() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let (transport, tx, sent) = scripted_transport("mock");
    let api = FeedApiClient::with_base_url(server.uri());
    let mut session = FeedSessionBuilder::new(api, Credentials::demo())
        .dialer(Arc::new(QueueDialer::new(vec![transport])))
        .fallback_to_polling(false)
        .build();
    let mut events = session.events();

    assert_eq!(session.connect().await.unwrap(), FeedMode::Live);
    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(true)));

    session.join_trading_room().await.unwrap();
    {
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("join-room"), "frame: {}", sent[0]);
        assert!(sent[0].contains("trading"), "frame: {}", sent[0]);
    }

    // A bare array and a typed stock-update, through whichever shape the
    // transport happens to use, reach subscribers normalized.
    tx.send(json!([{ "symbol": "AAPL", "price": 187.5 }])).unwrap();
    match next_event(&mut events).await {
        FeedEvent::TradingData(records) => assert_eq!(records[0]["symbol"], "AAPL"),
        other => panic!("expected TradingData, got {other:?}"),
    }

    tx.send(json!({ "type": "stock-update", "payload": { "symbol": "MSFT" } }))
        .unwrap();
    match next_event(&mut events).await {
        FeedEvent::StockUpdate(record) => assert_eq!(record["symbol"], "MSFT"),
        other => panic!("expected StockUpdate, got {other:?}"),
    }

    session.disconnect().await;
    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(false)));
}

#[tokio::test]
async fn session_reconnects_with_backoff_after_a_drop() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let (t1, tx1, _) = scripted_transport("first");
    let (t2, tx2, _) = scripted_transport("second");
    let api = FeedApiClient::with_base_url(server.uri());
    let mut session = FeedSessionBuilder::new(api, Credentials::demo())
        .dialer(Arc::new(QueueDialer::new(vec![t1, t2])))
        .reconnect(fast_reconnect(3))
        .fallback_to_polling(false)
        .build();
    let mut events = session.events();

    assert_eq!(session.connect().await.unwrap(), FeedMode::Live);
    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(true)));

    // Server-side drop: status goes down, then back up on the re-probe.
    drop(tx1);
    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(false)));
    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(true)));

    // The replacement transport is live.
    tx2.send(json!([{ "symbol": "NVDA" }])).unwrap();
    match next_event(&mut events).await {
        FeedEvent::TradingData(records) => assert_eq!(records[0]["symbol"], "NVDA"),
        other => panic!("expected TradingData, got {other:?}"),
    }

    assert!(session.status().reconnect_count >= 1);
    session.disconnect().await;
}

#[tokio::test]
async fn session_falls_back_to_polling_when_reconnection_exhausts() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_socket_hints(&server).await;
    Mock::given(method("GET"))
        .and(path("/securities/trading-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{ "symbol": "AAPL", "price": 3 }]
        })))
        .mount(&server)
        .await;

    let (t1, tx1, _) = scripted_transport("only");
    let api = FeedApiClient::with_base_url(server.uri());
    let mut session = FeedSessionBuilder::new(api, Credentials::demo())
        .dialer(Arc::new(QueueDialer::new(vec![t1])))
        .reconnect(fast_reconnect(1))
        .poll_interval(Duration::from_millis(20))
        .build();
    let mut events = session.events();

    assert_eq!(session.connect().await.unwrap(), FeedMode::Live);
    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(true)));

    // Drop the only transport; the single reconnect attempt fails and the
    // session degrades to polling, still feeding the same event contract.
    drop(tx1);
    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(false)));
    assert!(matches!(next_event(&mut events).await, FeedEvent::ConnectionStatus(true)));

    match next_event(&mut events).await {
        FeedEvent::TradingData(records) => assert_eq!(records[0]["price"], 3),
        other => panic!("expected TradingData, got {other:?}"),
    }
    assert_eq!(session.mode(), Some(FeedMode::Polling));

    session.disconnect().await;
}

// ===================================================================
// REST snapshot envelope tolerance
// ===================================================================

#[tokio::test]
async fn trading_status_tolerates_envelope_and_bare_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/securities/trading-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{ "symbol": "AAPL" }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/securities/trading-status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "symbol": "MSFT" }])),
        )
        .mount(&server)
        .await;

    let client = FeedApiClient::with_base_url(server.uri());

    let enveloped = client.trading_status().await.unwrap();
    assert_eq!(enveloped.len(), 1);
    assert_eq!(enveloped[0]["symbol"], "AAPL");

    let bare = client.trading_status().await.unwrap();
    assert_eq!(bare.len(), 1);
    assert_eq!(bare[0]["symbol"], "MSFT");
}

// ===================================================================
// WebSocket dialer against a real in-process server
// ===================================================================

/// Accept one WebSocket connection, capture the request URI, forward inbound
/// text frames to the test, and send the given frames to the client.
async fn spawn_ws_server(
    outbound: Vec<String>,
) -> (
    std::net::SocketAddr,
    tokio::sync::oneshot::Receiver<String>,
    mpsc::UnboundedReceiver<String>,
) {
    use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (uri_tx, uri_rx) = tokio::sync::oneshot::channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut uri_tx = Some(uri_tx);
        let callback = |req: &Request, resp: Response| {
            if let Some(tx) = uri_tx.take() {
                let _ = tx.send(req.uri().to_string());
            }
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .unwrap();

        for frame in outbound {
            ws.send(Message::Text(frame.into())).await.unwrap();
        }
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                let _ = inbound_tx.send(text.to_string());
            }
        }
    });

    (addr, uri_rx, inbound_rx)
}

#[tokio::test]
async fn ws_dialer_appends_token_query_and_exchanges_json() {
    let envelope = json!({ "type": "trading-data", "payload": [{ "symbol": "AAPL" }] });
    let (addr, uri_rx, mut inbound) =
        spawn_ws_server(vec!["2probe".to_owned(), envelope.to_string()]).await;

    let candidate = TransportCandidate {
        name: "test".to_owned(),
        url: url::Url::parse(&format!("ws://{addr}/feed")).unwrap(),
        auth: AuthMode::Query,
        timeout: Duration::from_secs(3),
    };

    let mut transport = WsDialer.dial(&candidate, Some("secret")).await.unwrap();

    let uri = uri_rx.await.unwrap();
    assert!(uri.contains("token=secret"), "uri: {uri}");

    // The non-JSON "2probe" frame is skipped; the envelope comes through.
    let msg = transport.stream.next_message().await.unwrap().unwrap();
    assert_eq!(msg["type"], "trading-data");

    transport
        .sink
        .send_text(json!({ "type": "join-room", "room": "trading" }).to_string())
        .await
        .unwrap();
    let received = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(received.contains("join-room"), "received: {received}");

    transport.sink.close().await.unwrap();
}

#[tokio::test]
async fn ws_dialer_sends_auth_payload_first() {
    let (addr, _uri_rx, mut inbound) = spawn_ws_server(Vec::new()).await;

    let candidate = TransportCandidate {
        name: "payload-auth".to_owned(),
        url: url::Url::parse(&format!("ws://{addr}/securities/ws")).unwrap(),
        auth: AuthMode::Payload,
        timeout: Duration::from_secs(3),
    };

    let mut transport = WsDialer.dial(&candidate, Some("secret")).await.unwrap();

    let first: Value = serde_json::from_str(
        &tokio::time::timeout(Duration::from_secs(5), inbound.recv())
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(first["type"], "auth");
    assert_eq!(first["token"], "secret");

    transport.sink.close().await.unwrap();
}
