// src/error.rs
//! Error taxonomy shared by every relay bot.
//!
//! Nothing here is fatal once a bot is running: the poller logs the error,
//! abandons the current cycle and tries again after the sleep interval.

use thiserror::Error;

/// Network or HTTP-level failure talking to the upstream API.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// The upstream answered, but not with what we expected.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected response shape: missing `{0}`")]
    Shape(&'static str),

    #[error("unrecognized date `{0}`")]
    Date(String),
}

/// Webhook delivery failure. The affected message is dropped.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("webhook still rate limited after {attempts} attempts")]
    RateLimited { attempts: u8 },
}

/// Startup configuration problems. These are the only errors that stop a bot,
/// and only before its loop starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("reading config file {path}: {message}")]
    File { path: String, message: String },
}

/// Everything that can abort one poll cycle.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl RelayError {
    /// Short label used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Fetch(_) => "fetch",
            RelayError::Parse(_) => "parse",
            RelayError::Notify(_) => "notify",
        }
    }
}
