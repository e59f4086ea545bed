//! Missive server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `missive-config.yaml` (or defaults)
//! 2. Initialize structured logging (tracing)
//! 3. Build the hub: empty store, default hooks, real-time channels
//! 4. Create any configured seed messages
//! 5. Serve HTTP + `WebSocket` until `Ctrl-C`

use std::path::Path;
use std::sync::Arc;

use missive_core::config::{LoggingConfig, DEFAULT_CONFIG_FILE};
use missive_core::MissiveConfig;
use missive_server::{start_server, AppState, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, seeding fails, or the
/// server cannot bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = MissiveConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        host = config.server.host,
        port = config.server.port,
        static_dir = %config.server.static_dir.display(),
        id_strategy = ?config.messages.id_strategy,
        "Configuration loaded"
    );

    // 3. Build shared state.
    let state = Arc::new(AppState::new(&config));

    // 4. Seed messages.
    if !config.messages.seed.is_empty() {
        let created = state.hub.seed(config.messages.seed.iter().cloned())?;
        info!(created, "Seed messages created");
    }

    // 5. Serve.
    start_server(&ServerConfig::from(&config.server), state).await?;
    Ok(())
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
