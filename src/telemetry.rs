use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::TelemetryConfig;

/// Initialize application logging.
///
/// Configures:
/// - `tracing-subscriber::fmt`, compact by default or JSON lines when
///   `telemetry.json` is set.
/// - `EnvFilter` for dynamic log levels (`RUST_LOG`).
pub fn init(config: &TelemetryConfig) {
    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,oauth_chat_server=debug"));

    let (compact_layer, json_layer) = if config.json {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            ),
        )
    } else {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .compact(),
            ),
            None,
        )
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(compact_layer)
        .with(json_layer)
        .init();
}
