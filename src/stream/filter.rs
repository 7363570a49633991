// src/stream/filter.rs
//! Long-lived filter stream connection with reconnect.

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use std::time::Duration;

use super::oauth::{authorization_header, nonce};
use super::{dispatch_line, LineBuffer, StatusHandler};
use crate::config::SocialCredentials;

pub const FILTER_URL: &str = "https://stream.twitter.com/1.1/statuses/filter.json";

/// Reconnect delays in milliseconds; the last value repeats.
pub const RECONNECT_BACKOFF_MS: &[u64] = &[5_000, 10_000, 20_000, 40_000, 80_000, 160_000, 320_000];

/// The stream sends a keep-alive newline every ~30s; silence this long means
/// the connection is dead.
const STALL_TIMEOUT: Duration = Duration::from_secs(90);

pub struct FilterStream {
    url: String,
    follow: Vec<String>,
    creds: SocialCredentials,
    client: reqwest::Client,
}

impl FilterStream {
    pub fn new(creds: SocialCredentials, follow: Vec<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("thetagang-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build stream client")?;
        Ok(Self {
            url: FILTER_URL.to_string(),
            follow,
            creds,
            client,
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Stream forever, reconnecting with backoff whenever the connection drops.
    pub async fn run<H: StatusHandler>(&self, handler: &mut H) {
        let mut backoff_idx = 0usize;
        loop {
            tracing::info!(follow = ?self.follow, "connecting to filter stream");
            match self.connect_once(handler).await {
                Ok(delivered) => {
                    tracing::info!(delivered, "filter stream closed");
                    if delivered > 0 {
                        backoff_idx = 0;
                    }
                }
                Err(e) => tracing::error!(error = %format!("{e:#}"), "filter stream error"),
            }

            let delay_ms = RECONNECT_BACKOFF_MS
                .get(backoff_idx)
                .or(RECONNECT_BACKOFF_MS.last())
                .copied()
                .unwrap_or(5_000);
            backoff_idx = (backoff_idx + 1).min(RECONNECT_BACKOFF_MS.len() - 1);

            tracing::warn!(delay_ms, "filter stream reconnecting");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    /// One connection; returns how many statuses were handed to `handler`.
    async fn connect_once<H: StatusHandler>(&self, handler: &mut H) -> Result<usize> {
        let follow = self.follow.join(",");
        let form = [("follow", follow.as_str())];
        let timestamp = chrono::Utc::now().timestamp().max(0) as u64;
        let auth = authorization_header(&self.creds, "POST", &self.url, &form, &nonce(), timestamp)?;

        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .form(&form)
            .send()
            .await
            .context("filter stream request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("filter stream returned HTTP {status}: {body}");
        }

        let mut bytes = Box::pin(resp.bytes_stream());
        let mut lines = LineBuffer::new();
        let mut delivered = 0usize;
        loop {
            let next = tokio::time::timeout(STALL_TIMEOUT, bytes.next())
                .await
                .context("filter stream stalled")?;
            let Some(chunk) = next else {
                return Ok(delivered);
            };
            let chunk = chunk.context("filter stream read")?;
            for line in lines.push(&chunk) {
                if dispatch_line(&line, handler).await == super::LineKind::Status {
                    delivered += 1;
                }
            }
        }
    }
}
