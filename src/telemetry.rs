// src/telemetry.rs
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Stdout log lines with timestamp, level and message.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init: a second call (tests, multiple bins in one process) is a no-op.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

/// One-time metrics registration (so series show up on /metrics).
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_cycles_total", "Completed poll cycles.");
        describe_counter!("relay_events_total", "Events fetched from upstream.");
        describe_counter!(
            "relay_notifications_total",
            "Sink calls that were delivered."
        );
        describe_counter!("relay_notify_errors_total", "Sink calls that failed.");
        describe_counter!(
            "relay_classification_miss_total",
            "Events no classification rule recognized."
        );
        describe_counter!(
            "relay_cycle_errors_total",
            "Cycles abandoned on fetch/parse errors."
        );
        describe_counter!("relay_fetch_errors_total", "Non-2xx upstream responses.");
        describe_counter!("relay_rate_limited_total", "429 answers from the webhook.");
        describe_histogram!("relay_fetch_ms", "Upstream fetch time in milliseconds.");
    });
}

/// Serve Prometheus metrics on `addr` when configured. Failures are logged,
/// never fatal.
pub fn init_metrics(addr: Option<SocketAddr>) {
    if let Some(addr) = addr {
        match PrometheusBuilder::new().with_http_listener(addr).install() {
            Ok(()) => tracing::info!(%addr, "prometheus exporter listening"),
            Err(e) => tracing::warn!(error = %e, %addr, "prometheus exporter not started"),
        }
    }
    // Descriptions go to whichever recorder is installed by now.
    describe_metrics();
}
