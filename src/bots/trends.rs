// src/bots/trends.rs
//! Trending ticker relay: diff the whole list against the previous poll.

use async_trait::async_trait;
use metrics::counter;

use super::{deliver, CycleReport, PollBot};
use crate::classify::DEFAULT_SITE_BASE;
use crate::error::RelayError;
use crate::feed::TrendFeed;
use crate::message::{Message, Notification};
use crate::notify::Notifier;

pub const BOT_NAME: &str = "trends";
pub const USERNAME: &str = "Trends Bot 🚀";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendDiff {
    /// Tickers in `current` that were not in `previous`, in `current` order.
    pub new: Vec<String>,
    /// Startup burst: nothing stored yet and more than one new ticker.
    pub suppressed: bool,
}

pub fn diff_trends(previous: &[String], current: &[String]) -> TrendDiff {
    let new: Vec<String> = current
        .iter()
        .filter(|t| !previous.contains(t))
        .cloned()
        .collect();
    let suppressed = previous.is_empty() && new.len() > 1;
    TrendDiff { new, suppressed }
}

pub fn trend_message(ticker: &str, site_base: &str) -> Message {
    Message::plain(format!(
        "New trending ticker: ${ticker} {}/symbols/{ticker}",
        site_base.trim_end_matches('/')
    ))
}

pub struct TrendRelay<F, N> {
    feed: F,
    notifier: N,
    site_base: String,
    previous: Vec<String>,
}

impl<F: TrendFeed, N: Notifier> TrendRelay<F, N> {
    pub fn new(feed: F, notifier: N) -> Self {
        Self {
            feed,
            notifier,
            site_base: DEFAULT_SITE_BASE.to_string(),
            previous: Vec::new(),
        }
    }

    pub fn with_site_base(mut self, site_base: impl Into<String>) -> Self {
        self.site_base = site_base.into();
        self
    }

    /// Trends stored after the last successful cycle.
    pub fn previous(&self) -> &[String] {
        &self.previous
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}

#[async_trait]
impl<F: TrendFeed, N: Notifier> PollBot for TrendRelay<F, N> {
    fn name(&self) -> &'static str {
        BOT_NAME
    }

    async fn run_cycle(&mut self) -> Result<CycleReport, RelayError> {
        let current = self.feed.fetch_trends().await?;
        counter!("relay_events_total", "bot" => BOT_NAME).increment(current.len() as u64);

        let diff = diff_trends(&self.previous, &current);
        tracing::debug!(latest = ?current, previous = ?self.previous, "trend lists");
        tracing::info!(new = ?diff.new, "new trends");

        let mut report = CycleReport {
            fetched: current.len(),
            duplicates: current.len() - diff.new.len(),
            ..CycleReport::default()
        };

        let plan: Vec<Notification> = if diff.suppressed {
            tracing::info!(count = diff.new.len(), "skipping new trends after restart");
            report.suppressed = diff.new.len();
            Vec::new()
        } else {
            diff.new
                .iter()
                .map(|t| Notification::Single(trend_message(t, &self.site_base)))
                .collect()
        };

        self.previous = current;

        let (sent, failed) = deliver(&self.notifier, BOT_NAME, plan).await;
        report.sent = sent;
        report.failed = failed;
        Ok(report)
    }
}
