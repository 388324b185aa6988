//! Live market feed: transport probing, session management, and fallback.
//!
//! The feed stack, bottom to top:
//!
//! - [`candidate`] — the ordered list of transport configurations to try
//! - [`transport`] — the strategy seam ([`TransportDialer`] et al.) and the
//!   WebSocket implementation
//! - [`probe`] — sequential candidate probing with per-candidate timeouts
//! - [`reconnect`] — capped exponential backoff policy
//! - [`dispatch`] — normalization of heterogeneous payload shapes into one
//!   event contract
//! - [`polling`] — HTTP snapshot polling with fingerprint deduplication
//! - [`session`] — the [`FeedSession`] tying it all together
//!
//! UI-facing consumers only need [`session::FeedSession`] and the event
//! receiver it hands out; everything below it is swappable.
//!
//! [`TransportDialer`]: transport::TransportDialer
//! [`FeedSession`]: session::FeedSession

pub mod candidate;
pub mod dispatch;
pub mod polling;
pub mod probe;
pub mod reconnect;
pub mod session;
pub mod transport;
