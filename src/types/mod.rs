//! Shared data types for the feed client.

pub mod auth;
pub mod feed;
