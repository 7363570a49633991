//! Send earnings reports from @EPSGUID to Discord.

use anyhow::Context;
use thetagang_relay::bots::earnings::{EarningsRelay, USERNAME};
use thetagang_relay::config::social::follow_ids_from;
use thetagang_relay::config::{RelayConfig, SocialCredentials};
use thetagang_relay::feed::thetagang::ThetagangClient;
use thetagang_relay::state::SeenSet;
use thetagang_relay::stream::filter::FilterStream;
use thetagang_relay::DiscordNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Both checked before anything connects.
    let cfg = RelayConfig::load().context("loading relay config")?;
    let creds = SocialCredentials::from_env().context("loading stream credentials")?;
    thetagang_relay::bootstrap(cfg.metrics_addr);

    let feed = ThetagangClient::new(&cfg.api_base, cfg.request_timeout)
        .context("building thetagang.com client")?;
    let notifier = DiscordNotifier::new(cfg.webhook_url.clone(), USERNAME)
        .with_timeout(cfg.request_timeout.as_secs());
    let seen = cfg
        .seen_capacity
        .map(SeenSet::with_capacity_limit)
        .unwrap_or_default();
    let mut relay = EarningsRelay::new(feed, notifier).with_seen(seen);

    let follow = follow_ids_from(std::env::var("FOLLOW_IDS").ok());
    let stream = FilterStream::new(creds, follow)?;

    tracing::info!("starting up");
    tokio::select! {
        _ = stream.run(&mut relay) => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    tracing::info!("shutting down");
    Ok(())
}
