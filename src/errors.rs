use crate::services::storage_service::{ErrorKind, StorageError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Error envelope returned to HTTP clients as `{code, message, status}`.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status, code and message.
    pub fn new(status: StatusCode, code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: msg.into(),
        }
    }

    /// Shortcut for 500; the detail is logged, not returned.
    pub fn internal(detail: impl fmt::Display) -> Self {
        tracing::error!("internal error: {}", detail);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalError",
            "Internal Server Error",
        )
    }

    /// Shortcut for 400 on paths that match no route.
    pub fn malformed_path(path: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "MalformedPath",
            format!("path `{}` does not address a bucket or an object", path),
        )
    }
}

/// The single table from error kind to HTTP status.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Io | ErrorKind::Format => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.code,
            "message": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(format!("{:#}", err))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let status = status_for(err.kind());
        if status.is_server_error() {
            // details stay in the log; clients get a generic message
            tracing::error!("storage failure: {}", err);
            AppError::new(status, err.code(), "Internal Server Error")
        } else {
            tracing::warn!("request rejected: {}", err);
            AppError::new(status, err.code(), err.to_string())
        }
    }
}
