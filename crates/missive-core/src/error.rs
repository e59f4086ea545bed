//! Error types for service calls.
//!
//! [`ServiceError`] is the single failure type flowing through the hook
//! pipeline. Error hooks observe it but never change it; transports map
//! it onto their own responses.

use crate::service::ServiceMethod;

/// Errors raised by a service method or one of its hooks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// A required field was missing from the payload.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The service does not implement the requested method.
    #[error("method `{0}` is not supported by this service")]
    MethodNotAllowed(ServiceMethod),

    /// Unexpected failure while touching the store.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Short class name used in wire error bodies (e.g. `BadRequest`).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Validation(_) => "BadRequest",
            Self::MethodNotAllowed(_) => "MethodNotAllowed",
            Self::Internal(_) => "GeneralError",
        }
    }
}
