//! Update dispatcher: payload-shape normalization.
//!
//! The transports deliver updates in different shapes — a typed envelope with
//! a `type` discriminator, a bare array, or a nested `data`/`payload` field.
//! [`normalize`] inspects the shape and extracts the logical update so that
//! subscribers only ever see [`FeedEvent::TradingData`] or
//! [`FeedEvent::StockUpdate`], whichever transport is active. Record content
//! is passed through unmodified.

use serde_json::Value;

use crate::types::feed::{FeedEvent, QuoteRecord};

/// Normalize one inbound message into a feed event.
///
/// Shape rules, in order:
/// - a bare array is trading data;
/// - an object with a `type` discriminator (`trading-data` / `stock-update`,
///   kebab, camel, or snake case) has its `payload` (or `data`) extracted;
/// - an object with a `data` or `payload` array but no discriminator defaults
///   to trading data;
/// - anything else is dropped with a trace log, returning `None`.
pub fn normalize(message: Value) -> Option<FeedEvent> {
    match message {
        Value::Array(records) => Some(FeedEvent::TradingData(records)),
        Value::Object(mut map) => {
            let discriminator = map
                .get("type")
                .and_then(Value::as_str)
                .map(str::to_owned);

            let body = map.remove("payload").or_else(|| map.remove("data"));

            match discriminator.as_deref() {
                Some("trading-data" | "tradingData" | "trading_data") => {
                    Some(FeedEvent::TradingData(as_records(body?)))
                }
                Some("stock-update" | "stockUpdate" | "stock_update") => {
                    Some(FeedEvent::StockUpdate(body?))
                }
                Some(other) => {
                    tracing::trace!(kind = other, "dropping message with unknown type");
                    None
                }
                // No discriminator: a nested array is treated as trading data.
                None => match body {
                    Some(inner) => Some(FeedEvent::TradingData(as_records(inner))),
                    None => {
                        tracing::trace!("dropping message with no recognizable shape");
                        None
                    }
                },
            }
        }
        _ => None,
    }
}

/// Coerce a payload into a record batch: arrays pass through, a single
/// record becomes a one-element batch.
fn as_records(body: Value) -> Vec<QuoteRecord> {
    match body {
        Value::Array(records) => records,
        other => vec![other],
    }
}
