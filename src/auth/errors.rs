//! Authentication rejection types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Why a request failed authentication or authorization.
#[derive(Debug)]
pub enum AuthErrorKind {
    MissingToken,
    InvalidToken,
    UserNotFound,
    AdminRequired,
    DatabaseError,
}

/// Rejection returned by the auth extractors. Serializes to the same
/// `{message, code}` shape as handler-level errors so clients have one
/// error contract.
#[derive(Debug)]
pub struct AuthError(pub(super) AuthErrorKind);

impl AuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self(kind)
    }

    fn status_code(&self) -> StatusCode {
        match self.0 {
            AuthErrorKind::MissingToken | AuthErrorKind::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthErrorKind::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthErrorKind::AdminRequired => StatusCode::FORBIDDEN,
            AuthErrorKind::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self.0 {
            AuthErrorKind::MissingToken => "Not authenticated",
            AuthErrorKind::InvalidToken => "Invalid or expired token",
            AuthErrorKind::UserNotFound => "User not found",
            AuthErrorKind::AdminRequired => "Admin access required",
            AuthErrorKind::DatabaseError => "Database error",
        }
    }

    fn code(&self) -> &'static str {
        match self.0 {
            AuthErrorKind::MissingToken | AuthErrorKind::InvalidToken => "INVALID_TOKEN",
            AuthErrorKind::UserNotFound => "NOT_FOUND",
            AuthErrorKind::AdminRequired => "FORBIDDEN",
            AuthErrorKind::DatabaseError => "INTERNAL",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: &'static str,
            code: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                message: self.message(),
                code: self.code(),
            }),
        )
            .into_response()
    }
}
