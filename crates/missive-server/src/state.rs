//! Shared application state for the gateway.
//!
//! [`AppState`] is wrapped in [`Arc`](std::sync::Arc) and injected into
//! handlers via Axum's `State` extractor. It owns the [`Hub`], which in
//! turn owns the message store and the real-time connection registry.

use std::path::PathBuf;

use missive_core::{Hub, MissiveConfig};

/// Shared state for the Axum application.
#[derive(Debug)]
pub struct AppState {
    /// Service pipeline and real-time channels.
    pub hub: Hub,
    /// Directory served for unmatched paths.
    pub static_dir: PathBuf,
}

impl AppState {
    /// Build state from configuration, with an empty message store.
    pub fn new(config: &MissiveConfig) -> Self {
        Self {
            hub: Hub::new(config),
            static_dir: config.server.static_dir.clone(),
        }
    }

    /// Wrap an already-configured hub (e.g. one with extra hooks).
    pub const fn with_hub(hub: Hub, static_dir: PathBuf) -> Self {
        Self { hub, static_dir }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&MissiveConfig::default())
    }
}
