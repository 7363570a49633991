// src/bots/trades.rs
//! Patron trade relay.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use metrics::counter;
use serde::Deserialize;
use std::str::FromStr;

use super::{deliver, CycleReport, PollBot};
use crate::classify::{ClassificationMiss, FormatCtx, RuleSet, DEFAULT_SITE_BASE};
use crate::error::RelayError;
use crate::feed::types::{Lifecycle, Trade};
use crate::feed::TradeFeed;
use crate::message::{plan_notifications, BatchPolicy};
use crate::notify::Notifier;
use crate::state::RelayState;

pub const BOT_NAME: &str = "trades";
pub const USERNAME: &str = "Trades Bot 📈";

/// Whether common-stock trades bypass the openings-only rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockPolicy {
    /// Stock trades are recorded already closed, so always let them through.
    Always,
    /// Stock trades follow the same lifecycle rule as options.
    #[serde(alias = "open_only")]
    OpenOnly,
}

impl FromStr for StockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(StockPolicy::Always),
            "open-only" | "open_only" => Ok(StockPolicy::OpenOnly),
            other => Err(format!("unknown stock policy `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeFilter {
    pub patrons_only: bool,
    pub openings_only: bool,
    pub stock_policy: StockPolicy,
}

impl Default for TradeFilter {
    fn default() -> Self {
        Self {
            patrons_only: true,
            openings_only: true,
            stock_policy: StockPolicy::Always,
        }
    }
}

impl TradeFilter {
    pub fn accepts(&self, trade: &Trade) -> bool {
        if self.patrons_only && !trade.is_patron() {
            return false;
        }
        if !self.openings_only || trade.lifecycle() == Lifecycle::Open {
            return true;
        }
        trade.is_stock() && self.stock_policy == StockPolicy::Always
    }
}

/// Dedupe key: guid plus lifecycle, so a trade announced when opened is
/// announced again when it closes.
pub fn identity(trade: &Trade) -> String {
    format!("{}:{}", trade.guid, trade.lifecycle().as_str())
}

pub struct TradeRelay<F, N> {
    feed: F,
    notifier: N,
    rules: RuleSet,
    filter: TradeFilter,
    batch: BatchPolicy,
    site_base: String,
    state: RelayState,
}

impl<F: TradeFeed, N: Notifier> TradeRelay<F, N> {
    pub fn new(feed: F, notifier: N) -> Self {
        Self {
            feed,
            notifier,
            rules: RuleSet::trades(),
            filter: TradeFilter::default(),
            batch: BatchPolicy::Combine,
            site_base: DEFAULT_SITE_BASE.to_string(),
            state: RelayState::default(),
        }
    }

    pub fn with_filter(mut self, filter: TradeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_batch(mut self, batch: BatchPolicy) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_state(mut self, state: RelayState) -> Self {
        self.state = state;
        self
    }

    pub fn with_site_base(mut self, site_base: impl Into<String>) -> Self {
        self.site_base = site_base.into();
        self
    }

    pub fn state(&self) -> &RelayState {
        &self.state
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// One cycle with an explicit clock for expiry formatting.
    pub async fn cycle_at(&mut self, now: NaiveDateTime) -> Result<CycleReport, RelayError> {
        let raw = self.feed.fetch_trades(None).await?;
        let ctx = FormatCtx::new(now, self.site_base.as_str());

        let mut report = CycleReport {
            fetched: raw.len(),
            ..CycleReport::default()
        };
        counter!("relay_events_total", "bot" => BOT_NAME).increment(raw.len() as u64);

        let mut fresh = Vec::new();
        // The API lists newest first; announce in chronological order.
        for item in raw.iter().rev() {
            let trade = match Trade::from_value(item) {
                Ok(t) => t,
                Err(e) => {
                    report.misses += 1;
                    tracing::warn!(error = %e, payload = %item, "skipping undecodable trade");
                    continue;
                }
            };

            if !self.filter.accepts(&trade) {
                report.filtered += 1;
                continue;
            }

            let key = identity(&trade);
            let already_seen = self.state.seen().contains(&key);
            if !self.state.should_notify(&key) {
                if already_seen {
                    report.duplicates += 1;
                    tracing::debug!(%key, "trade was seen before");
                } else {
                    report.suppressed += 1;
                    tracing::debug!(%key, "recording backlog trade on first run");
                }
                continue;
            }

            match self.rules.classify(&trade, &ctx) {
                Some(msg) => {
                    tracing::info!(%key, symbol = %trade.symbol, kind = %trade.trade_type, "new trade");
                    fresh.push(msg);
                }
                None => {
                    let miss = ClassificationMiss {
                        guid: trade.guid.clone(),
                        type_tag: trade.trade_type.clone(),
                        raw: item.clone(),
                    };
                    report.misses += 1;
                    counter!("relay_classification_miss_total", "bot" => BOT_NAME).increment(1);
                    tracing::warn!(
                        guid = %miss.guid,
                        type_tag = %miss.type_tag,
                        payload = %miss.raw,
                        "no classification rule for trade type"
                    );
                }
            }
        }

        self.state.finish_cycle();

        let plan = plan_notifications(fresh, self.batch, "trades");
        let (sent, failed) = deliver(&self.notifier, BOT_NAME, plan).await;
        report.sent = sent;
        report.failed = failed;
        Ok(report)
    }
}

#[async_trait]
impl<F: TradeFeed, N: Notifier> PollBot for TradeRelay<F, N> {
    fn name(&self) -> &'static str {
        BOT_NAME
    }

    async fn run_cycle(&mut self) -> Result<CycleReport, RelayError> {
        self.cycle_at(chrono::Utc::now().naive_utc()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trade(role: &str, kind: &str, closed: bool) -> Trade {
        let close_date = if closed { json!("2026-01-01") } else { json!(null) };
        Trade::from_value(&json!({
            "guid": "g",
            "symbol": "SPY",
            "type": kind,
            "User": {"username": "u", "role": role},
            "close_date": close_date
        }))
        .unwrap()
    }

    #[test]
    fn default_filter_keeps_open_patron_trades() {
        let f = TradeFilter::default();
        assert!(f.accepts(&trade("patron", "CASH SECURED PUT", false)));
        assert!(!f.accepts(&trade("member", "CASH SECURED PUT", false)));
        assert!(!f.accepts(&trade("patron", "CASH SECURED PUT", true)));
    }

    #[test]
    fn stock_policy_decides_closed_stock_trades() {
        let stock = trade("patron", "BUY COMMON STOCK", true);
        assert!(TradeFilter::default().accepts(&stock));
        let strict = TradeFilter {
            stock_policy: StockPolicy::OpenOnly,
            ..TradeFilter::default()
        };
        assert!(!strict.accepts(&stock));
    }

    #[test]
    fn closing_trades_pass_when_openings_only_is_off() {
        let f = TradeFilter {
            openings_only: false,
            ..TradeFilter::default()
        };
        assert!(f.accepts(&trade("patron", "COVERED CALL", true)));
        assert!(!f.accepts(&trade("member", "COVERED CALL", true)));
    }

    #[test]
    fn identity_is_stable_and_tracks_lifecycle() {
        let open = trade("patron", "COVERED CALL", false);
        let closed = trade("patron", "COVERED CALL", true);
        assert_eq!(identity(&open), identity(&open));
        assert_eq!(identity(&open), "g:open");
        assert_eq!(identity(&closed), "g:closed");
    }

    #[test]
    fn stock_policy_parses() {
        assert_eq!("always".parse::<StockPolicy>(), Ok(StockPolicy::Always));
        assert_eq!("Open-Only".parse::<StockPolicy>(), Ok(StockPolicy::OpenOnly));
        assert!("sometimes".parse::<StockPolicy>().is_err());
    }
}
