//! OAuth Chat Server
//!
//! Entry point: load configuration, initialise logging, serve.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use oauth_chat_server::{config::AppConfig, server, telemetry};

#[tokio::main]
async fn main() {
    // Load .env (if present) before configuration reads the environment
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init(&config.telemetry);

    if let Err(e) = server::start_server(config).await {
        tracing::error!(error = ?e, "Server failed");
        std::process::exit(1);
    }
}
