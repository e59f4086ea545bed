//! `WebSocket` handler for real-time events and service calls.
//!
//! Clients connect to `GET /ws`. On connect the socket joins the
//! `everybody` group and receives every published
//! [`ServiceEvent`](missive_core::channel::ServiceEvent) as a
//! JSON text frame.
//!
//! Clients can also call service methods over the socket by sending
//! a [`SocketCall`] frame:
//!
//! ```json
//! {"id": 1, "method": "create", "path": "messages", "data": {"text": "hi"}}
//! ```
//!
//! Each call gets one [`SocketReply`] carrying the same `id` and either a
//! `result` or an `error`. Calls go through the same hub as REST calls,
//! so they run the same hooks and publish the same events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use missive_core::hooks::HookContext;
use missive_core::{ConnectionId, Hub, MessageData, MessageId, Outcome, Params, ServiceMethod};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

/// A service call sent by a client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketCall {
    /// Caller-chosen correlation id, echoed in the reply.
    #[serde(default)]
    pub id: serde_json::Value,
    /// Method to call.
    pub method: ServiceMethod,
    /// Resource path. Defaults to the message service.
    #[serde(default)]
    pub path: Option<String>,
    /// Record id for `update`, `patch`, and `remove`.
    #[serde(default)]
    pub resource_id: Option<MessageId>,
    /// Payload for `create`, `update`, and `patch`.
    #[serde(default)]
    pub data: Option<MessageData>,
}

/// Reply to a [`SocketCall`].
#[derive(Debug, Serialize)]
pub struct SocketReply {
    /// Correlation id copied from the call.
    pub id: serde_json::Value,
    /// Call result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Outcome>,
    /// Error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl SocketReply {
    fn from_result(id: serde_json::Value, result: Result<Outcome, ApiError>) -> Self {
        match result {
            Ok(outcome) => Self {
                id,
                result: Some(outcome),
                error: None,
            },
            Err(err) => Self {
                id,
                result: None,
                error: Some(err.body()),
            },
        }
    }
}

/// Upgrade an HTTP request to a `WebSocket` connection.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_connect(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: forward published events, answer
/// service calls, and deregister the connection when the socket closes.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (connection_id, mut rx) = state.hub.connect();
    debug!(%connection_id, "WebSocket client connected");

    loop {
        tokio::select! {
            // Forward a published event.
            event = rx.recv() => {
                let Some(event) = event else {
                    debug!(%connection_id, "Event channel closed, shutting down WebSocket");
                    break;
                };
                let Some(frame) = encode(&event) else {
                    continue;
                };
                if socket.send(frame).await.is_err() {
                    debug!(%connection_id, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            // Handle a frame from the client.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%connection_id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_call(&state.hub, connection_id, text.as_str());
                        let Some(frame) = encode(&reply) else {
                            continue;
                        };
                        if socket.send(frame).await.is_err() {
                            debug!(%connection_id, "WebSocket client disconnected (reply failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%connection_id, "WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%connection_id, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Binary and pong frames are ignored.
                    }
                }
            }
        }
    }

    state.hub.disconnect(connection_id);
}

fn encode<T: Serialize>(value: &T) -> Option<Message> {
    match serde_json::to_string(value) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to serialize WebSocket frame: {e}");
            None
        }
    }
}

/// Decode and run one service call from a text frame.
pub fn handle_call(hub: &Hub, connection_id: ConnectionId, text: &str) -> SocketReply {
    let call: SocketCall = match serde_json::from_str(text) {
        Ok(call) => call,
        Err(e) => {
            return SocketReply::from_result(
                serde_json::Value::Null,
                Err(ApiError::BadRequest(format!("malformed call: {e}"))),
            );
        }
    };

    let result = dispatch(hub, connection_id, &call);
    SocketReply::from_result(call.id, result)
}

fn dispatch(hub: &Hub, connection_id: ConnectionId, call: &SocketCall) -> Result<Outcome, ApiError> {
    let path = hub.messages().path();
    if let Some(requested) = call.path.as_deref() {
        if requested != path {
            return Err(ApiError::NotFound(format!("no service at path '{requested}'")));
        }
    }

    let mut context = HookContext::new(path, call.method, Params::socket(connection_id))
        .with_id(call.resource_id);
    if let Some(data) = call.data.clone() {
        context = context.with_data(data);
    }
    hub.call(context).map_err(ApiError::from)
}
