// src/lib.rs
// Public library surface for the relay binaries and integration tests.

pub mod bots;
pub mod classify;
pub mod config;
pub mod error;
pub mod feed;
pub mod format;
pub mod message;
pub mod notify;
pub mod state;
pub mod stream;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::bots::{run_forever, run_once, CycleReport, PollBot};
pub use crate::error::{ConfigError, FetchError, NotifyError, ParseError, RelayError};
pub use crate::message::{BatchPolicy, Embed, Message, Notification};
pub use crate::notify::{DiscordNotifier, Notifier, RecordingNotifier};

/// Shared startup for every binary: logging, then metrics.
pub fn bootstrap(metrics_addr: Option<std::net::SocketAddr>) {
    telemetry::init_tracing();
    telemetry::init_metrics(metrics_addr);
}
