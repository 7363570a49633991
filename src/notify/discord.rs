use async_trait::async_trait;
use metrics::counter;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use super::Notifier;
use crate::error::NotifyError;
use crate::message::{Embed, Message, Notification};

/// Discord rejects `content` longer than this.
pub const CONTENT_LIMIT: usize = 2000;
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    username: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordNotifier {
    pub fn new(webhook: String, username: impl Into<String>) -> Self {
        Self {
            webhook,
            username: username.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 5,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    /// Posts the payload, honouring 429 `retry_after` and backing off on
    /// transport errors and 5xx.
    async fn post(&self, payload: &WebhookPayload) -> Result<(), NotifyError> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            let rsp = match res {
                Ok(rsp) => rsp,
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    return Err(NotifyError::Request(e));
                }
            };

            let status = rsp.status();
            if status.is_success() {
                return Ok(());
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                counter!("relay_rate_limited_total").increment(1);
                let header = rsp
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let body = rsp.text().await.unwrap_or_default();
                if attempt < self.max_retries {
                    let wait = retry_after(header.as_deref(), &body);
                    tracing::info!(wait_ms = wait.as_millis() as u64, "discord rate limited, waiting");
                    tokio::time::sleep(wait).await;
                    continue;
                }
                return Err(NotifyError::RateLimited { attempts: attempt });
            }

            if status.is_server_error() && attempt < self.max_retries {
                tokio::time::sleep(backoff(attempt)).await;
                continue;
            }

            let body = rsp.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, n: &Notification) -> Result<(), NotifyError> {
        let payload = WebhookPayload::from_notification(&self.username, n);
        self.post(&payload).await
    }
}

fn backoff(attempt: u8) -> Duration {
    Duration::from_millis(500u64 << (attempt.saturating_sub(1)).min(6))
}

/// How long Discord asked us to wait. The JSON body (`retry_after`, seconds)
/// wins over the `Retry-After` header; one second if neither parses.
pub fn retry_after(header: Option<&str>, body: &str) -> Duration {
    let from_body = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("retry_after").and_then(serde_json::Value::as_f64));
    let from_header = header.and_then(|h| h.trim().parse::<f64>().ok());

    from_body
        .or(from_header)
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(Duration::from_secs(1))
        .min(MAX_RATE_LIMIT_WAIT)
}

fn truncate_content(s: &str) -> String {
    if s.chars().count() <= CONTENT_LIMIT {
        return s.to_string();
    }
    let mut out: String = s.chars().take(CONTENT_LIMIT - 1).collect();
    out.push('…');
    out
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbedThumbnail {
    url: String,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<EmbedThumbnail>,
}

impl From<&Embed> for DiscordEmbed {
    fn from(e: &Embed) -> Self {
        Self {
            title: e.title.clone(),
            description: e.description.clone(),
            color: e
                .color
                .as_deref()
                .and_then(|c| u32::from_str_radix(c.trim_start_matches('#'), 16).ok()),
            url: e.url.clone(),
            footer: e.footer.clone().map(|text| EmbedFooter { text }),
            thumbnail: e.thumbnail_url.clone().map(|url| EmbedThumbnail { url }),
        }
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl WebhookPayload {
    fn from_notification(username: &str, n: &Notification) -> Self {
        match n {
            Notification::Single(Message {
                embed: Some(embed), ..
            }) => Self {
                username: username.to_string(),
                content: None,
                embeds: vec![embed.into()],
            },
            other => Self {
                username: username.to_string(),
                content: Some(truncate_content(&other.plain_text())),
                embeds: Vec::new(),
            },
        }
    }
}
