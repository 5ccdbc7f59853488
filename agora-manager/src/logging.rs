//! Standardized logging initialisers for the simulation manager and the
//! processes it supervises.
//!
//! Grounded in `toucan_core::logging`: the same two entry points (plain and
//! JSON), the same `RUST_LOG`-driven [`tracing_subscriber::EnvFilter`]. The
//! teacher's `AuditSpanFilter` layer (which muted a specific noisy audit
//! span) has no counterpart here — this substrate has no audit-replica span
//! to filter — so it is dropped rather than carried over unused.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize human-readable logging. Honors `RUST_LOG`; defaults to `info`.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init()
}

/// Initialize JSON logging, for shipping to a log aggregator.
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init()
}
