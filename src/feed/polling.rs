//! Polling fallback.
//!
//! When no live transport wins the probe (or reconnection gives up), the
//! session emulates push updates by re-fetching the full quote snapshot at a
//! fixed interval and emitting `TradingData` only when the snapshot actually
//! changed. Change detection uses a cheap fingerprint of the raw body rather
//! than a deep comparison.
//!
//! A failed fetch on one tick is logged at trace and skipped; polling
//! continues at a constant rate — no backoff — until the session is
//! disconnected. Ticks are serialized by the poll loop, so a slow fetch
//! delays the next tick instead of overlapping it.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::client::FeedApiClient;
use crate::feed::dispatch::normalize;
use crate::types::feed::FeedEvent;

/// How much of the body feeds the fingerprint. The backend serializes
/// volatile fields (prices, timestamps) near the front of each record, so a
/// bounded prefix is enough to catch real changes cheaply.
const FINGERPRINT_PREFIX_BYTES: usize = 512;

/// Cheap content fingerprint of a snapshot body: total length plus a hash of
/// a bounded prefix.
pub fn fingerprint(body: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    body.len().hash(&mut hasher);
    let end = body.len().min(FINGERPRINT_PREFIX_BYTES);
    body.as_bytes()[..end].hash(&mut hasher);
    hasher.finish()
}

/// Run the poll loop until the owning task is aborted.
///
/// Fires the push-pipeline hints once at startup (best-effort, failures
/// ignored), then fetches the snapshot every `interval`, dispatching through
/// [`normalize`] only when the fingerprint differs from the previous tick's.
pub(crate) async fn run_polling(
    api: FeedApiClient,
    interval: Duration,
    events_tx: broadcast::Sender<FeedEvent>,
) {
    // Hint the backend to re-arm its push infrastructure. Best-effort.
    if let Err(e) = api.force_reconnect().await {
        tracing::trace!(error = %e, "force-reconnect hint failed");
    }
    if let Err(e) = api.start_socket().await {
        tracing::trace!(error = %e, "start-socket hint failed");
    }

    tracing::info!(interval_ms = interval.as_millis() as u64, "polling fallback active");

    let mut last_fingerprint: Option<u64> = None;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let body = match api.trading_status_text().await {
            Ok(body) => body,
            Err(e) => {
                // One bad tick is not an outage; the next tick retries.
                tracing::trace!(error = %e, "poll tick failed");
                continue;
            }
        };

        let fp = fingerprint(&body);
        if last_fingerprint == Some(fp) {
            continue;
        }
        last_fingerprint = Some(fp);

        match serde_json::from_str(&body) {
            Ok(value) => {
                if let Some(event) = normalize(value) {
                    let _ = events_tx.send(event);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "unparseable snapshot body");
            }
        }
    }
}
