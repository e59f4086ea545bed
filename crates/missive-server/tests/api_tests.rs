//! Integration tests for the REST endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use missive_core::channel::EventKind;
use missive_core::{Hub, MessageId, MissiveConfig, Outcome};
use missive_server::router::build_router;
use missive_server::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

fn make_test_state() -> Arc<AppState> {
    Arc::new(AppState::with_hub(
        Hub::default(),
        PathBuf::from("/nonexistent/missive-static"),
    ))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn post_json(body: &str) -> Request<Body> {
    Request::post("/messages")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn delete(id: &str) -> Request<Body> {
    Request::delete(format!("/messages/{id}"))
        .body(Body::empty())
        .unwrap()
}

fn list() -> Request<Body> {
    Request::get("/messages").body(Body::empty()).unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_list_empty() {
    let router = build_router(make_test_state());
    let (status, json) = send(&router, list()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_create_returns_201_with_timestamp() {
    let router = build_router(make_test_state());
    let (status, json) = send(&router, post_json(r#"{"text": "hi"}"#)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["id"], 0);
    assert_eq!(json["text"], "hi");
    assert!(json["createdAt"].is_string());
    assert!(json.get("updatedAt").is_none());
}

#[tokio::test]
async fn test_create_accepts_form_body() {
    let router = build_router(make_test_state());
    let request = Request::post("/messages")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("text=hello+there"))
        .unwrap();
    let (status, json) = send(&router, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["text"], "hello there");
}

#[tokio::test]
async fn test_create_without_text_is_400() {
    let router = build_router(make_test_state());
    let (status, json) = send(&router, post_json("{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["name"], "BadRequest");
    assert_eq!(json["code"], 400);

    let (_, list) = send(&router, list()).await;
    assert_eq!(list, Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_create_with_malformed_json_is_400() {
    let router = build_router(make_test_state());
    let (status, json) = send(&router, post_json("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["name"], "BadRequest");
}

#[tokio::test]
async fn test_caller_cannot_set_created_at() {
    let router = build_router(make_test_state());
    let (_, json) = send(
        &router,
        post_json(r#"{"text": "hi", "createdAt": "1999-01-01T00:00:00Z"}"#),
    )
    .await;
    assert_ne!(json["createdAt"], "1999-01-01T00:00:00Z");
}

#[tokio::test]
async fn test_create_list_remove_scenario() {
    let router = build_router(make_test_state());
    send(&router, post_json(r#"{"text": "hi"}"#)).await;
    send(&router, post_json(r#"{"text": "yo"}"#)).await;

    let (_, json) = send(&router, list()).await;
    assert_eq!(json[0]["id"], 0);
    assert_eq!(json[1]["id"], 1);
    assert_eq!(json[1]["text"], "yo");

    let (status, json) = send(&router, delete("0")).await;
    assert_eq!(status, StatusCode::OK);
    let remaining = json.as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["text"], "yo");

    // Removing again is a no-op that still succeeds.
    let (status, again) = send(&router, delete("0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, json);
}

#[tokio::test]
async fn test_remove_with_non_numeric_id_is_400() {
    let router = build_router(make_test_state());
    let (status, json) = send(&router, delete("abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);
}

#[tokio::test]
async fn test_update_and_patch_are_405() {
    let router = build_router(make_test_state());
    send(&router, post_json(r#"{"text": "hi"}"#)).await;

    for method in ["PUT", "PATCH"] {
        let request = Request::builder()
            .method(method)
            .uri("/messages/0")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"text": "changed"}"#))
            .unwrap();
        let (status, json) = send(&router, request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json["name"], "MethodNotAllowed");
    }

    let (_, list) = send(&router, list()).await;
    assert_eq!(list[0]["text"], "hi");
}

#[tokio::test]
async fn test_rest_mutations_reach_realtime_clients() {
    let state = make_test_state();
    let (_, mut rx) = state.hub.connect();
    let router = build_router(Arc::clone(&state));

    send(&router, post_json(r#"{"text": "hi"}"#)).await;
    send(&router, list()).await;
    send(&router, delete("0")).await;

    let created = rx.try_recv().unwrap();
    assert_eq!(created.event, EventKind::Created);
    assert!(matches!(created.data, Outcome::Record(ref m) if m.id == MessageId(0)));

    let removed = rx.try_recv().unwrap();
    assert_eq!(removed.event, EventKind::Removed);
    assert_eq!(removed.data, Outcome::Collection(Vec::new()));

    // `find` published nothing.
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_health() {
    let state = make_test_state();
    let (_, _rx) = state.hub.connect();
    let router = build_router(state);
    send(&router, post_json(r#"{"text": "hi"}"#)).await;

    let (status, json) = send(
        &router,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["messages"], 1);
    assert_eq!(json["connections"], 1);
}

#[tokio::test]
async fn test_unknown_path_is_json_404() {
    let router = build_router(make_test_state());
    let (status, json) = send(
        &router,
        Request::get("/nope.txt").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["name"], "NotFound");
}

#[tokio::test]
async fn test_static_files_are_served() {
    let dir = std::env::temp_dir().join(format!("missive-static-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<h1>missive</h1>").unwrap();

    let mut config = MissiveConfig::default();
    config.server.static_dir.clone_from(&dir);
    let router = build_router(Arc::new(AppState::new(&config)));

    let response = router
        .oneshot(Request::get("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<h1>missive</h1>");

    std::fs::remove_dir_all(&dir).unwrap();
}
