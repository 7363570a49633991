// src/feed/thetagang.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;
use std::time::{Duration, Instant};

use super::{parse_listing, parse_trends, Listing, TradeFeed, TrendFeed};
use crate::error::{FetchError, RelayError};

pub const DEFAULT_API_BASE: &str = "https://api.thetagang.com";

/// Client for the thetagang.com JSON API.
pub struct ThetagangClient {
    mode: Mode,
}

enum Mode {
    // Canned response bodies, for tests and dry runs.
    Fixture { trades: String, trends: String },
    Http { base: String, client: reqwest::Client },
}

impl ThetagangClient {
    /// HTTP client with an explicit per-request timeout.
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("thetagang-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            mode: Mode::Http {
                base: base.into().trim_end_matches('/').to_string(),
                client,
            },
        })
    }

    pub fn from_fixture(trades_body: &str, trends_body: &str) -> Self {
        Self {
            mode: Mode::Fixture {
                trades: trades_body.to_string(),
                trends: trends_body.to_string(),
            },
        }
    }

    async fn get_body(
        client: &reqwest::Client,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let resp = client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            counter!("relay_fetch_errors_total").increment(1);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        histogram!("relay_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(body)
    }
}

#[async_trait]
impl TradeFeed for ThetagangClient {
    async fn fetch_trades(&self, ticker: Option<&str>) -> Result<Vec<Value>, RelayError> {
        match &self.mode {
            Mode::Fixture { trades, .. } => {
                let items = parse_listing(trades, Listing::Trades)?;
                Ok(match ticker {
                    Some(t) => items
                        .into_iter()
                        .filter(|it| {
                            it.get("symbol")
                                .and_then(Value::as_str)
                                .is_some_and(|s| s.eq_ignore_ascii_case(t))
                        })
                        .collect(),
                    None => items,
                })
            }
            Mode::Http { base, client } => {
                let url = format!("{base}/trades");
                let query: Vec<(&str, &str)> = ticker.map(|t| ("ticker", t)).into_iter().collect();
                let body = Self::get_body(client, &url, &query).await?;
                Ok(parse_listing(&body, Listing::Trades)?)
            }
        }
    }
}

#[async_trait]
impl TrendFeed for ThetagangClient {
    async fn fetch_trends(&self) -> Result<Vec<String>, RelayError> {
        match &self.mode {
            Mode::Fixture { trends, .. } => Ok(parse_trends(trends)?),
            Mode::Http { base, client } => {
                let url = format!("{base}/trends");
                let body = Self::get_body(client, &url, &[]).await?;
                Ok(parse_trends(&body)?)
            }
        }
    }
}
