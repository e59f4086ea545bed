//! REST endpoint handlers.
//!
//! Each handler translates an HTTP request into a [`Hub`] call, so REST
//! callers go through the same hooks and trigger the same real-time
//! events as `WebSocket` callers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/messages` | List all messages |
//! | `POST` | `/messages` | Create a message (JSON or form body) |
//! | `PUT` | `/messages/{id}` | Replace a message (not supported, 405) |
//! | `PATCH` | `/messages/{id}` | Modify a message (not supported, 405) |
//! | `DELETE` | `/messages/{id}` | Remove a message, return the rest |
//! | `GET` | `/health` | Liveness plus store and connection counts |
//!
//! [`Hub`]: missive_core::Hub

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use missive_core::{MessageData, MessageId, Params};

use crate::error::ApiError;
use crate::extract::Payload;
use crate::state::AppState;

/// Response body for `GET /health`.
#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    /// Always `ok` when the server answers.
    pub status: &'static str,
    /// Number of stored messages.
    pub messages: usize,
    /// Number of open real-time connections.
    pub connections: usize,
}

fn parse_id(raw: &str) -> Result<MessageId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid message id {raw:?}: {e}")))
}

/// List all messages in insertion order.
///
/// # Route
///
/// `GET /messages`
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.hub.find(Params::rest(query))?;
    Ok(Json(messages))
}

/// Create a message from a `{ "text": ... }` body.
///
/// # Route
///
/// `POST /messages`
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BTreeMap<String, String>>,
    Payload(data): Payload<MessageData>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.hub.create(data, Params::rest(query))?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Replace a message.
///
/// # Route
///
/// `PUT /messages/{id}`
pub async fn update_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
    Payload(data): Payload<MessageData>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.hub.update(parse_id(&id)?, data, Params::rest(query))?;
    Ok(Json(message))
}

/// Modify part of a message.
///
/// # Route
///
/// `PATCH /messages/{id}`
pub async fn patch_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
    Payload(data): Payload<MessageData>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.hub.patch(parse_id(&id)?, data, Params::rest(query))?;
    Ok(Json(message))
}

/// Remove a message and return the remaining ones. Unknown ids are not
/// an error.
///
/// # Route
///
/// `DELETE /messages/{id}`
pub async fn remove_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let remaining = state.hub.remove(parse_id(&id)?, Params::rest(query))?;
    Ok(Json(remaining))
}

/// Report liveness.
///
/// # Route
///
/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok",
        messages: state.hub.messages().service().count()?,
        connections: state.hub.channels().connection_count(),
    }))
}

/// Fallback for paths that match neither a route nor a static file.
pub async fn not_found() -> ApiError {
    ApiError::NotFound(String::from("no route or file matches this path"))
}
