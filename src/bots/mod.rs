// src/bots/mod.rs
//! The poll loop shared by every polling bot.
//!
//! A bot only knows how to run one cycle; `run_forever` owns scheduling.
//! Cycles never overlap: the next one starts after the previous cycle and the
//! sleep have both finished.

pub mod earnings;
pub mod trades;
pub mod trends;

use async_trait::async_trait;
use metrics::counter;
use std::time::Duration;

use crate::error::RelayError;
use crate::message::Notification;
use crate::notify::Notifier;

/// Counters for one cycle, logged after each run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    /// Dropped by the trade filter (role / lifecycle policy).
    pub filtered: usize,
    /// Already in the seen set.
    pub duplicates: usize,
    /// New, but swallowed by first-run or startup-burst suppression.
    pub suppressed: usize,
    /// Records that could not be decoded or matched no rule.
    pub misses: usize,
    pub sent: usize,
    pub failed: usize,
}

#[async_trait]
pub trait PollBot: Send {
    fn name(&self) -> &'static str;

    /// One fetch -> filter -> dedupe -> classify -> notify pass.
    ///
    /// An `Err` means the cycle was abandoned before anything was sent.
    /// Sink failures are counted in the report, not returned.
    async fn run_cycle(&mut self) -> Result<CycleReport, RelayError>;
}

/// Run one cycle and log the outcome. Errors never escape.
pub async fn run_once<B: PollBot + ?Sized>(bot: &mut B) -> Option<CycleReport> {
    let name = bot.name();
    match bot.run_cycle().await {
        Ok(report) => {
            counter!("relay_cycles_total", "bot" => name).increment(1);
            tracing::info!(
                bot = name,
                fetched = report.fetched,
                filtered = report.filtered,
                duplicates = report.duplicates,
                suppressed = report.suppressed,
                misses = report.misses,
                sent = report.sent,
                failed = report.failed,
                "cycle complete"
            );
            Some(report)
        }
        Err(e) => {
            counter!("relay_cycle_errors_total", "bot" => name, "kind" => e.kind()).increment(1);
            tracing::warn!(bot = name, kind = e.kind(), error = %e, "cycle abandoned");
            None
        }
    }
}

/// Poll forever at a fixed interval. Stops only when the task is dropped.
pub async fn run_forever<B: PollBot + ?Sized>(bot: &mut B, interval: Duration) {
    tracing::info!(bot = bot.name(), interval_secs = interval.as_secs(), "starting poll loop");
    loop {
        run_once(bot).await;
        tokio::time::sleep(interval).await;
    }
}

/// Send each notification once. Failures are logged and dropped.
pub(crate) async fn deliver<N: Notifier + ?Sized>(
    notifier: &N,
    bot: &'static str,
    plan: Vec<Notification>,
) -> (usize, usize) {
    let (mut sent, mut failed) = (0, 0);
    for n in plan {
        match notifier.send(&n).await {
            Ok(()) => {
                sent += 1;
                counter!("relay_notifications_total", "bot" => bot).increment(1);
            }
            Err(e) => {
                failed += 1;
                counter!("relay_notify_errors_total", "bot" => bot).increment(1);
                tracing::warn!(
                    bot,
                    messages = n.message_count(),
                    error = %e,
                    "notification dropped"
                );
            }
        }
    }
    (sent, failed)
}
