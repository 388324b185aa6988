//! REST endpoint implementations.
//!
//! Each submodule adds endpoint methods to
//! [`FeedApiClient`](crate::client::FeedApiClient) via `impl` blocks:
//!
//! - [`auth`] — login and token extraction
//! - [`securities`] — quote snapshots and push-pipeline hints

pub mod auth;
pub mod securities;

pub use auth::extract_token;
