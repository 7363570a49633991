// src/feed/mod.rs
pub mod thetagang;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ParseError, RelayError};

/// Source of raw trade records, newest first (the API's order).
///
/// Items stay as raw JSON so that records we cannot decode or classify can be
/// logged verbatim.
#[async_trait]
pub trait TradeFeed: Send + Sync {
    async fn fetch_trades(&self, ticker: Option<&str>) -> Result<Vec<Value>, RelayError>;
}

/// Source of the current trending tickers.
#[async_trait]
pub trait TrendFeed: Send + Sync {
    async fn fetch_trends(&self) -> Result<Vec<String>, RelayError>;
}

/// Which list inside the `{"data": {...}}` envelope to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Trades,
    Trends,
}

impl Listing {
    fn key(self) -> &'static str {
        match self {
            Listing::Trades => "trades",
            Listing::Trends => "trends",
        }
    }

    fn path(self) -> &'static str {
        match self {
            Listing::Trades => "data.trades",
            Listing::Trends => "data.trends",
        }
    }
}

/// Pull `data.<listing>` out of a response body.
pub fn parse_listing(body: &str, listing: Listing) -> Result<Vec<Value>, ParseError> {
    let root: Value = serde_json::from_str(body.trim())?;
    root.get("data")
        .and_then(|d| d.get(listing.key()))
        .and_then(Value::as_array)
        .cloned()
        .ok_or(ParseError::Shape(listing.path()))
}

/// Trending tickers, dropping anything that is not a string.
pub fn parse_trends(body: &str) -> Result<Vec<String>, ParseError> {
    let items = parse_listing(body, Listing::Trends)?;
    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
