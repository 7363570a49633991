// src/bots/earnings.rs
//! Earnings report relay: statuses from a followed account, kept only when
//! the ticker was recently traded on thetagang.com.

use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;

use super::deliver;
use crate::error::RelayError;
use crate::feed::TradeFeed;
use crate::message::{Message, Notification};
use crate::notify::Notifier;
use crate::state::SeenSet;
use crate::stream::StatusHandler;

pub const BOT_NAME: &str = "earnings";
pub const USERNAME: &str = "Earnings Bot 💰";

/// Generic tags the account also posts under; those are not reports.
const IGNORED_HASHTAGS: &[&str] = &["earnings", "volatility"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarningsReport {
    pub symbol: String,
    pub hashtag: String,
    pub text: String,
    pub emoji: &'static str,
}

/// What happened to one incoming status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Retweet,
    Unparsed,
    Duplicate,
    NotTraded,
    LookupFailed,
    Sent,
    SendFailed,
}

/// Red when the tag contains `miss` (case-sensitive), green otherwise.
pub fn emoji_for(hashtag: &str) -> &'static str {
    if hashtag.contains("miss") {
        "🔴"
    } else {
        "🟢"
    }
}

fn status_text(status: &Value) -> Option<&str> {
    status
        .pointer("/extended_tweet/full_text")
        .or_else(|| status.get("full_text"))
        .or_else(|| status.get("text"))
        .and_then(Value::as_str)
}

fn entities(status: &Value) -> Option<&Value> {
    status
        .pointer("/extended_tweet/entities")
        .or_else(|| status.get("entities"))
}

pub fn is_retweet(status: &Value) -> bool {
    status.get("retweeted").and_then(Value::as_bool).unwrap_or(false)
        || status.get("retweeted_status").is_some()
        || status_text(status).is_some_and(|t| t.contains("RT @"))
}

/// First cashtag and first hashtag are required.
pub fn parse_earnings(status: &Value) -> Option<EarningsReport> {
    let ents = entities(status)?;
    let symbol = ents.pointer("/symbols/0/text").and_then(Value::as_str)?;
    let hashtag = ents.pointer("/hashtags/0/text").and_then(Value::as_str)?;

    if IGNORED_HASHTAGS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(hashtag))
    {
        return None;
    }

    let text = html_escape::decode_html_entities(status_text(status)?).to_string();
    Some(EarningsReport {
        symbol: symbol.to_uppercase(),
        hashtag: hashtag.to_string(),
        emoji: emoji_for(hashtag),
        text,
    })
}

pub fn earnings_message(report: &EarningsReport) -> Message {
    Message::plain(format!("{} {}", report.emoji, report.text))
}

/// Has anyone on thetagang.com traded `symbol` recently?
pub async fn recently_traded<F: TradeFeed + ?Sized>(
    feed: &F,
    symbol: &str,
) -> Result<bool, RelayError> {
    let trades = feed.fetch_trades(Some(symbol)).await?;
    if trades.is_empty() {
        tracing::info!(symbol, "no thetagang.com trades");
        return Ok(false);
    }
    tracing::info!(symbol, count = trades.len(), "found thetagang.com trades");
    Ok(true)
}

pub struct EarningsRelay<F, N> {
    feed: F,
    notifier: N,
    seen: SeenSet,
}

impl<F: TradeFeed, N: Notifier> EarningsRelay<F, N> {
    pub fn new(feed: F, notifier: N) -> Self {
        Self {
            feed,
            notifier,
            seen: SeenSet::new(),
        }
    }

    pub fn with_seen(mut self, seen: SeenSet) -> Self {
        self.seen = seen;
        self
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub async fn handle(&mut self, raw: &Value) -> StatusOutcome {
        counter!("relay_events_total", "bot" => BOT_NAME).increment(1);
        let text = status_text(raw).unwrap_or_default();

        if is_retweet(raw) {
            tracing::info!(text, "found a retweet, skipping");
            return StatusOutcome::Retweet;
        }

        let Some(report) = parse_earnings(raw) else {
            counter!("relay_classification_miss_total", "bot" => BOT_NAME).increment(1);
            tracing::info!(text, "parse failed");
            return StatusOutcome::Unparsed;
        };

        // Reconnects can replay the same status.
        let key = raw
            .get("id_str")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| report.text.clone());
        if !self.seen.insert(&key) {
            tracing::debug!(%key, "status was seen before");
            return StatusOutcome::Duplicate;
        }

        match recently_traded(&self.feed, &report.symbol).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(symbol = %report.symbol, "no recent trades");
                return StatusOutcome::NotTraded;
            }
            Err(e) => {
                tracing::warn!(symbol = %report.symbol, error = %e, "trade lookup failed, dropping report");
                return StatusOutcome::LookupFailed;
            }
        }

        tracing::info!(symbol = %report.symbol, "sending earnings message");
        let plan = vec![Notification::Single(earnings_message(&report))];
        match deliver(&self.notifier, BOT_NAME, plan).await {
            (1, _) => StatusOutcome::Sent,
            _ => StatusOutcome::SendFailed,
        }
    }
}

#[async_trait]
impl<F: TradeFeed, N: Notifier> StatusHandler for EarningsRelay<F, N> {
    async fn on_status(&mut self, raw: Value) {
        let outcome = self.handle(&raw).await;
        tracing::debug!(?outcome, "status handled");
    }
}
