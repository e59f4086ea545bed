//! Error types for the HTTP gateway.
//!
//! [`ApiError`] unifies service failures and request-shape failures into
//! a single enum that converts into an Axum response. The same
//! [`ErrorBody`] is sent to `WebSocket` callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use missive_core::ServiceError;
use serde::Serialize;

/// Errors that can occur in the gateway layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service or one of its hooks failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// No route or resource matched.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body or path could not be parsed.
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// JSON error body: `{"name", "message", "code"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Error class name (e.g. `BadRequest`).
    pub name: &'static str,
    /// Human-readable message.
    pub message: String,
    /// HTTP status code.
    pub code: u16,
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Service(ServiceError::Validation(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Service(ServiceError::MethodNotAllowed(_)) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Service(ServiceError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Wire representation of this error.
    pub fn body(&self) -> ErrorBody {
        let name = match self {
            Self::Service(err) => err.name(),
            Self::NotFound(_) => "NotFound",
            Self::BadRequest(_) => "BadRequest",
        };
        ErrorBody {
            name,
            message: self.to_string(),
            code: self.status().as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), axum::Json(self.body())).into_response()
    }
}
