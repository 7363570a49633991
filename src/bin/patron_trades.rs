//! Relay trades from thetagang.com patrons to Discord.

use anyhow::Context;
use thetagang_relay::bots::trades::{TradeRelay, USERNAME};
use thetagang_relay::config::RelayConfig;
use thetagang_relay::feed::thetagang::ThetagangClient;
use thetagang_relay::state::{RelayState, SeenSet};
use thetagang_relay::{run_forever, DiscordNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let cfg = RelayConfig::load().context("loading relay config")?;
    thetagang_relay::bootstrap(cfg.metrics_addr);

    let feed = ThetagangClient::new(&cfg.api_base, cfg.request_timeout)
        .context("building thetagang.com client")?;
    let notifier = DiscordNotifier::new(cfg.webhook_url.clone(), USERNAME)
        .with_timeout(cfg.request_timeout.as_secs());
    let seen = cfg
        .seen_capacity
        .map(SeenSet::with_capacity_limit)
        .unwrap_or_default();

    let mut bot = TradeRelay::new(feed, notifier)
        .with_filter(cfg.trade_filter)
        .with_batch(cfg.batch)
        .with_site_base(cfg.site_base.clone())
        .with_state(RelayState::new(seen));

    tokio::select! {
        _ = run_forever(&mut bot, cfg.poll_interval) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}
