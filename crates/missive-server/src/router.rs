//! Axum router construction.
//!
//! Assembles REST routes, the `WebSocket` endpoint, and static file
//! serving into a single [`Router`] with CORS and request tracing.

use std::sync::Arc;

use axum::handler::HandlerWithoutStateExt;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /messages`, `POST /messages` -- list and create
/// - `PUT`/`PATCH`/`DELETE /messages/{id}` -- update, patch, remove
/// - `GET /ws` -- `WebSocket` events and service calls
/// - `GET /health` -- liveness
/// - anything else -- files under the configured static directory, or a
///   JSON 404
///
/// CORS allows any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files =
        ServeDir::new(&state.static_dir).not_found_service(handlers::not_found.into_service());

    Router::new()
        // REST API
        .route(
            "/messages",
            get(handlers::list_messages).post(handlers::create_message),
        )
        .route(
            "/messages/{id}",
            axum::routing::put(handlers::update_message)
                .patch(handlers::patch_message)
                .delete(handlers::remove_message),
        )
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws", get(ws::ws_connect))
        // Static files
        .fallback_service(static_files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
