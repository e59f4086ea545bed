//! HTTP + `WebSocket` gateway for the Missive message backend.
//!
//! This crate provides an Axum server that exposes the `messages`
//! resource from [`missive_core`]:
//!
//! - **REST endpoints** (`/messages`, `/messages/{id}`) for find, create,
//!   and remove, with JSON or URL-encoded bodies
//! - **`WebSocket` endpoint** (`/ws`) that pushes every created/removed
//!   event to all connected clients and accepts service calls
//! - **Static files** from a configurable directory for anything else
//!
//! # Architecture
//!
//! Handlers hold no logic. Each one turns a request into a call on the
//! shared [`Hub`](missive_core::Hub), which runs hooks, mutates the
//! store, and publishes the resulting event. REST and `WebSocket`
//! callers therefore see identical behavior.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use state::AppState;
