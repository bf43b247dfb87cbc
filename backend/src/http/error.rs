//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::AuthError;
use crate::db::RepositoryError;
use crate::services::EngineError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Internal(String),
    Engine(EngineError),
    Auth(AuthError),
    Repository(RepositoryError),
}

fn repository_status(err: &RepositoryError) -> (StatusCode, &'static str) {
    match err {
        RepositoryError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        RepositoryError::ValidationError { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        RepositoryError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl AppError {
    fn parts(self) -> (StatusCode, ApiError) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg)),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::new("UNAUTHORIZED", msg))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Engine(e) => {
                let message = e.to_string();
                match e {
                    EngineError::NotFound(_) => {
                        (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", message))
                    }
                    EngineError::Forbidden(_) => {
                        (StatusCode::FORBIDDEN, ApiError::new("FORBIDDEN", message))
                    }
                    EngineError::Validation(_) => {
                        (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", message))
                    }
                    EngineError::Conflict(_) => {
                        (StatusCode::CONFLICT, ApiError::new("CONFLICT", message))
                    }
                    EngineError::InsufficientFunds { required, available } => (
                        StatusCode::BAD_REQUEST,
                        ApiError::new("INSUFFICIENT_FUNDS", message).with_details(
                            serde_json::json!({ "required": required, "available": available }),
                        ),
                    ),
                    EngineError::VersionConflict { current } => (
                        StatusCode::CONFLICT,
                        ApiError::new("VERSION_CONFLICT", message)
                            .with_details(serde_json::json!({ "current_version": current })),
                    ),
                    EngineError::Repository(e) => AppError::Repository(e).parts(),
                }
            }
            AppError::Auth(e) => {
                let message = e.to_string();
                match e {
                    AuthError::InvalidCredentials
                    | AuthError::InvalidToken(_)
                    | AuthError::TokenExpired
                    | AuthError::TokenRevoked => {
                        (StatusCode::UNAUTHORIZED, ApiError::new("UNAUTHORIZED", message))
                    }
                    AuthError::InactiveUser => {
                        (StatusCode::FORBIDDEN, ApiError::new("FORBIDDEN", message))
                    }
                    AuthError::Validation(_) => {
                        (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", message))
                    }
                    AuthError::Conflict(_) => {
                        (StatusCode::CONFLICT, ApiError::new("CONFLICT", message))
                    }
                    AuthError::Hashing(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiError::new("INTERNAL_ERROR", message),
                    ),
                    AuthError::Repository(e) => AppError::Repository(e).parts(),
                }
            }
            AppError::Repository(e) => {
                let (status, code) = repository_status(&e);
                (status, ApiError::new(code, e.to_string()))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        if status.is_server_error() {
            error!(code = %body.code, message = %body.message, "Request failed");
        }
        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Engine(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}
