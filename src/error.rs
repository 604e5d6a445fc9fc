//! Shared error handling for handlers and middleware.
//!
//! Server-side detail is logged; callers only ever see generic status
//! pages. Validation and credential failures are handled locally in the
//! handlers and never reach this type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::render;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, AppError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, AppError> {
        self.map_err(|e| AppError::internal(msg, e))
    }
}

/// Request outcome taxonomy with automatic response conversion.
#[derive(Debug)]
pub enum AppError {
    /// Unmatched route or referenced record absent.
    NotFound,
    /// Malformed request (CSRF mismatch, unparseable input).
    BadRequest(&'static str),
    /// Request body exceeded the fixed ceiling.
    PayloadTooLarge,
    /// Internal fault; detail already logged.
    Server,
}

impl AppError {
    /// Log an internal failure with full detail, surface a generic error.
    pub fn internal(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Server
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, text) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found"),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"),
            AppError::Server => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        };
        (status, render::error_page(text)).into_response()
    }
}
