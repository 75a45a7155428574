//! Tracing setup: a plain formatting layer, no exporter. Nothing in
//! this deployment consumes OpenTelemetry spans, so there is nothing
//! to wire one up to.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `tracing` subscriber: JSON-free human formatting,
/// level from `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
