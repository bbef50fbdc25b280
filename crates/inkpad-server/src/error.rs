//! HTTP error types for the Inkpad server.
//!
//! Maps domain errors from `inkpad-core` into HTTP responses. Every variant
//! produces a JSON body with a single `error` field; rate limiting also
//! carries a `Retry-After` header. Login failures always collapse to the
//! generic `Invalid credentials` message so nothing about the configured
//! account leaks.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use inkpad_core::error::{ContentError, SessionError, ValidateError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Client sent invalid input.
    BadRequest(String),
    /// Missing or invalid session cookie.
    Unauthorized,
    /// Login attempt with wrong or malformed credentials.
    InvalidCredentials,
    /// Too many login attempts from one client.
    RateLimited { retry_after_secs: i64 },
    /// Requested content item does not exist.
    NotFound(String),
    /// Internal server error.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_owned(), None),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid credentials".to_owned(),
                None,
            ),
            Self::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many login attempts, try again later".to_owned(),
                Some(retry_after_secs),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let mut response = (status, Json(ErrorBody { error: message })).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<ValidateError> for AppError {
    fn from(err: ValidateError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Validate(inner) => Self::BadRequest(inner.to_string()),
            ContentError::Storage(inner) if inner.is_not_found() => {
                Self::NotFound(inner.to_string())
            }
            ContentError::Storage(inner) => Self::Internal(inner.to_string()),
            ContentError::Frontmatter(inner) => Self::Internal(inner.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        Self::Internal(err.to_string())
    }
}
