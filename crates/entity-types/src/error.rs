//! Shared error taxonomy (spec §7), surfaced identically at both
//! binaries' HTTP boundaries: a generic `{error, kind, message}` body,
//! full context logged server-side only via `tracing::error!`.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    Conflict,
    DeadState,
    RateLimited,
    Internal,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    DeadState(String),
    #[error("{0}")]
    RateLimited { message: String, retry_after_s: u64 },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Auth(_) => ErrorKind::Auth,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Conflict(_) => ErrorKind::Conflict,
            ApiError::DeadState(_) => ErrorKind::DeadState,
            ApiError::RateLimited { .. } => ErrorKind::RateLimited,
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::DeadState(_) => StatusCode::GONE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Internal errors never leak their detail message to the client;
    /// callers should `tracing::error!` the original cause before
    /// converting it into this variant.
    pub fn internal(context: impl Into<String>) -> Self {
        ApiError::Internal(context.into())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: bool,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_s: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let (message, retry_after_s) = match &self {
            ApiError::Internal(_) => ("internal error".to_string(), None),
            ApiError::RateLimited {
                message,
                retry_after_s,
            } => (message.clone(), Some(*retry_after_s)),
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            error: true,
            kind,
            message,
            retry_after_s,
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_state_maps_to_410() {
        let err = ApiError::DeadState("no longer alive".into());
        assert_eq!(err.status(), StatusCode::GONE);
    }

    #[test]
    fn rate_limited_maps_to_429() {
        let err = ApiError::RateLimited {
            message: "cooldown".into(),
            retry_after_s: 30,
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn internal_message_is_generic() {
        let err = ApiError::Internal("leaked db dsn".into());
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
