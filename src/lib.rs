//! # tradefeed-rs
//!
//! A resilient live market-data feed client for the securities trading
//! backend: credential login, empirical transport discovery, WebSocket
//! streaming with reconnection, and graceful degradation to HTTP polling.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tradefeed_rs::client::FeedApiClient;
//! use tradefeed_rs::feed::session::FeedSession;
//! use tradefeed_rs::types::auth::Credentials;
//!
//! #[tokio::main]
//! async fn main() -> tradefeed_rs::error::Result<()> {
//!     let api = FeedApiClient::new();
//!     let mut session = FeedSession::new(api, Credentials::new("user", "pass"));
//!
//!     let mode = session.connect().await?;
//!     println!("feed up in {mode} mode");
//!
//!     let mut events = session.events();
//!     session.join_trading_room().await?;
//!     while let Ok(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod constants;
pub mod error;
pub mod feed;
pub mod types;

/// Re-export the main entry points at crate root for convenience.
pub use client::FeedApiClient;
/// Re-export the error type and Result alias.
pub use error::{FeedError, Result};
pub use feed::session::{FeedConfig, FeedSession, FeedSessionBuilder};
pub use types::auth::Credentials;
pub use types::feed::{ConnectionState, FeedEvent, FeedMode, FeedStatus, QuoteRecord};
