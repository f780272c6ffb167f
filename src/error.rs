use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Reasons the gate refuses to authenticate a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Access denied. No token provided.")]
    MissingToken,
    #[error("Invalid token.")]
    InvalidToken,
    #[error("Token expired.")]
    ExpiredToken,
    #[error("Invalid token. User not found.")]
    UserNotFound,
    #[error("Invalid email or password")]
    InvalidCredentials,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Access denied. Admin privileges required.")]
    Forbidden,

    #[error("Cannot remove your own admin role")]
    SelfDemotion,

    #[error("Cannot delete your own account")]
    SelfDeletion,

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("database query timed out")]
    Timeout,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) | Self::SelfDemotion | Self::SelfDeletion => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Storage(_) | Self::Timeout | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Auth(_) => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::SelfDemotion | Self::SelfDeletion => "SELF_PROTECTION",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let body = match &self {
            Self::Storage(e) => {
                error!(error = %e, code, "storage failure");
                json!({ "error": "Database operation failed", "code": code })
            }
            Self::Timeout => {
                error!(code, "query timeout");
                json!({
                    "error": "Query timeout. Database might be slow or unresponsive.",
                    "code": code,
                    "suggestion": "Check database performance and connectivity.",
                })
            }
            Self::Internal(e) => {
                error!(error = ?e, code, "internal failure");
                json!({ "error": "Internal server error", "code": code })
            }
            other => json!({ "error": other.to_string(), "code": code }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// `true` when Postgres rejected a write because of a unique constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Name of the constraint or index behind a database error, if any.
pub fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}
