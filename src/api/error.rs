//! Shared error handling for API endpoints.
//!
//! Every failure body is `{message, code}`: `message` is human-readable,
//! `code` is the machine-readable discriminator clients switch on (in
//! particular `ACCOUNT_BLOCKED`, which the client interceptor treats as a
//! forced logout rather than a refresh trigger).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, ApiError>;
    fn internal_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::db_error(msg, e))
    }
    fn internal_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| {
            error!("{}: {}", msg, e);
            ApiError::Internal(msg.to_string())
        })
    }
}

/// API error type with automatic response conversion.
pub enum ApiError {
    /// Missing or malformed input (400)
    Validation(String),
    /// Email already belongs to an account (400)
    DuplicateEmail(String),
    /// Resource does not exist (404)
    NotFound(String),
    /// Login-style lookup failure; the original contract uses 400 here
    UnknownUser(String),
    /// Password did not verify (400)
    InvalidCredentials(String),
    /// Account is administratively blocked (403)
    Blocked(String),
    /// No token supplied where one is required (401)
    MissingToken(String),
    /// Expired, malformed, forged, or revoked token - not distinguished (403)
    InvalidToken(String),
    /// Authenticated but not allowed (403)
    Forbidden(String),
    /// Unexpected persistence or signing failure (500)
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn duplicate_email(msg: impl Into<String>) -> Self {
        Self::DuplicateEmail(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unknown_user(msg: impl Into<String>) -> Self {
        Self::UnknownUser(msg.into())
    }

    pub fn invalid_credentials(msg: impl Into<String>) -> Self {
        Self::InvalidCredentials(msg.into())
    }

    pub fn blocked(msg: impl Into<String>) -> Self {
        Self::Blocked(msg.into())
    }

    pub fn missing_token(msg: impl Into<String>) -> Self {
        Self::MissingToken(msg.into())
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn db_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal("Database error".into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::DuplicateEmail(_)
            | ApiError::UnknownUser(_)
            | ApiError::InvalidCredentials(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MissingToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::Blocked(_) | ApiError::InvalidToken(_) | ApiError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION",
            ApiError::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            ApiError::NotFound(_) | ApiError::UnknownUser(_) => "NOT_FOUND",
            ApiError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            ApiError::Blocked(_) => "ACCOUNT_BLOCKED",
            ApiError::MissingToken(_) | ApiError::InvalidToken(_) => "INVALID_TOKEN",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Internal(_) => "INTERNAL",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match self {
            ApiError::Validation(msg)
            | ApiError::DuplicateEmail(msg)
            | ApiError::NotFound(msg)
            | ApiError::UnknownUser(msg)
            | ApiError::InvalidCredentials(msg)
            | ApiError::Blocked(msg)
            | ApiError::MissingToken(msg)
            | ApiError::InvalidToken(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Internal(msg) => msg,
        };
        (status, Json(ErrorResponse { message, code })).into_response()
    }
}
