//! Monitor thetagang.com trends and notify Discord.

use anyhow::Context;
use thetagang_relay::bots::trends::{TrendRelay, USERNAME};
use thetagang_relay::config::RelayConfig;
use thetagang_relay::feed::thetagang::ThetagangClient;
use thetagang_relay::{run_forever, DiscordNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cfg = RelayConfig::load().context("loading relay config")?;
    thetagang_relay::bootstrap(cfg.metrics_addr);

    let feed = ThetagangClient::new(&cfg.api_base, cfg.request_timeout)
        .context("building thetagang.com client")?;
    let notifier = DiscordNotifier::new(cfg.webhook_url.clone(), USERNAME)
        .with_timeout(cfg.request_timeout.as_secs());

    let mut bot = TrendRelay::new(feed, notifier).with_site_base(cfg.site_base.clone());

    tokio::select! {
        _ = run_forever(&mut bot, cfg.poll_interval) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}
