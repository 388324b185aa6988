//! Sequential transport probing.
//!
//! Candidates are tried strictly in order, one open attempt outstanding at a
//! time. Individual candidate failures are logged and swallowed so the caller
//! sees a single connection attempt that either yields a transport or a
//! uniform [`FeedError::ProbeExhausted`]. Falling back to polling is *not*
//! decided here — that is the session's call.

use crate::error::{FeedError, Result};
use crate::feed::candidate::TransportCandidate;
use crate::feed::transport::{ActiveTransport, TransportDialer};

/// Try candidates left to right until one opens.
///
/// Each candidate gets its configured timeout; a candidate that neither opens
/// nor errors in time is treated as failed and the probe advances. The timed
/// out dial future is dropped, cancelling the underlying connection attempt.
pub async fn probe(
    dialer: &dyn TransportDialer,
    candidates: &[TransportCandidate],
    token: Option<&str>,
) -> Result<ActiveTransport> {
    for candidate in candidates {
        tracing::debug!(candidate = %candidate.name, url = %candidate.url, "probing");

        match tokio::time::timeout(candidate.timeout, dialer.dial(candidate, token)).await {
            Ok(Ok(transport)) => {
                tracing::info!(candidate = %candidate.name, "probe succeeded");
                return Ok(transport);
            }
            Ok(Err(e)) => {
                tracing::warn!(candidate = %candidate.name, error = %e, "candidate failed");
            }
            Err(_) => {
                tracing::warn!(
                    candidate = %candidate.name,
                    timeout_ms = candidate.timeout.as_millis() as u64,
                    "candidate timed out"
                );
            }
        }
    }

    Err(FeedError::ProbeExhausted {
        attempted: candidates.len(),
    })
}
