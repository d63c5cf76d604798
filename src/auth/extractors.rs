//! Axum extractors for authentication and the admin authorization boundary.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::bearer::bearer_token;
use super::errors::{AuthError, AuthErrorKind};
use super::state::HasAuthState;
use crate::db::{User, UserRole};
use crate::jwt::Claims;

/// Extractor for endpoints that require a valid access token.
///
/// Validation is purely cryptographic (signature + expiry): no database
/// lookup and no blocked check. The blocked gate sits at login and refresh,
/// so an already-issued access token keeps working until it expires.
pub struct Auth(pub Claims);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AuthError::new(AuthErrorKind::MissingToken))?;

        let claims = state
            .tokens()
            .validate_access(token)
            .map_err(|_| AuthError::new(AuthErrorKind::InvalidToken))?;

        Ok(Auth(claims))
    }
}

/// Extractor for admin-only endpoints.
///
/// The single authorization boundary for role checks: validates the access
/// token, loads the account, and rejects non-admins. Handlers behind this
/// extractor never re-check the role.
pub struct AdminAuth(pub User);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(claims) = Auth::from_request_parts(parts, state).await?;

        let user = state
            .db()
            .users()
            .find_by_uuid(&claims.sub)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load user for admin check");
                AuthError::new(AuthErrorKind::DatabaseError)
            })?
            .ok_or_else(|| AuthError::new(AuthErrorKind::UserNotFound))?;

        if user.role != UserRole::Admin {
            return Err(AuthError::new(AuthErrorKind::AdminRequired));
        }

        Ok(AdminAuth(user))
    }
}
