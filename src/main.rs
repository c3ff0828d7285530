//! duplexd - realtime session server binary.
//!
//! Serves the demo chat handlers over the HTTP gateway.

use duplexd::config::{Config, validate};
use duplexd::handlers::chat_handlers;
use duplexd::metrics;
use duplexd::network::{Gateway, router};
use duplexd::server::Server;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.server.name,
        path = %config.server.path,
        polling = config.transport.polling,
        websocket = config.transport.websocket,
        "Starting duplexd"
    );

    if config.server.metrics_path.is_some() {
        metrics::init();
        info!("Metrics initialized");
    } else {
        info!("Metrics disabled");
    }

    let server = Server::with_options(
        Arc::new(chat_handlers()),
        config.transport.server_options(),
    );

    let gateway = Gateway::bind(config.listen.address, router(server, &config)).await?;
    gateway.run().await?;

    Ok(())
}
