//! Authentication API endpoints - the session lifecycle.
//!
//! - POST `/register` - Create an account
//! - POST `/login` - Verify credentials, issue both tokens, persist the refresh token
//! - POST `/refresh` - Exchange a valid refresh token for a new access token
//! - POST `/logout` - Revoke the stored refresh token
//!
//! Exactly one refresh token is live per account: login overwrites the
//! stored value, so the previous session's refresh token stops validating
//! the moment a new login completes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::db::{Database, UserRole};
use crate::jwt::TokenIssuer;
use crate::password::{hash_password, verify_password};

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub tokens: Arc<TokenIssuer>,
}

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct PublicUser {
    id: String,
    name: String,
    email: String,
}

#[derive(Serialize)]
struct RegisterResponse {
    message: &'static str,
    user: PublicUser,
}

async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(name), Some(email), Some(password)) =
        (payload.name, payload.email, payload.password)
    else {
        return Err(ApiError::validation("All fields are required"));
    };

    let name = name.trim().to_string();
    let email = email.trim().to_string();
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("All fields are required"));
    }

    let existing = state
        .db
        .users()
        .find_by_email(&email)
        .await
        .db_err("Failed to check for existing user")?;
    if existing.is_some() {
        return Err(ApiError::duplicate_email("User already exists"));
    }

    let password_hash = hash_password(&password).internal_err("Failed to hash password")?;

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .users()
        .create(&uuid, &name, &email, &password_hash, UserRole::User, false)
        .await
        .db_err("Failed to create user")?;

    info!(user = %uuid, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user: PublicUser {
                id: uuid,
                name,
                email,
            },
        }),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginUser {
    id: String,
    name: String,
    email: String,
    role: UserRole,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    message: &'static str,
    access_token: String,
    refresh_token: String,
    user: LoginUser,
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(ApiError::validation("Email and password are required"));
    };
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let user = state
        .db
        .users()
        .find_by_email(&email)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unknown_user("User not found"))?;

    // Blocked accounts are rejected before the password check, so a blocked
    // user cannot probe credential validity through this endpoint.
    if user.is_blocked {
        return Err(ApiError::blocked(
            "Your account is blocked by the admin, please contact support",
        ));
    }

    let matches =
        verify_password(&password, &user.password_hash).internal_err("Failed to verify password")?;
    if !matches {
        return Err(ApiError::invalid_credentials("Invalid credentials"));
    }

    let access = state
        .tokens
        .issue_access(&user.uuid)
        .internal_err("Failed to generate access token")?;
    let refresh = state
        .tokens
        .issue_refresh(&user.uuid)
        .internal_err("Failed to generate refresh token")?;

    // Persisting the new refresh token revokes any previous session.
    state
        .db
        .users()
        .set_refresh_token(&user.uuid, &refresh.token)
        .await
        .db_err("Failed to store refresh token")?;

    info!(user = %user.uuid, "Login successful");

    Ok(Json(LoginResponse {
        message: "Login successful",
        access_token: access.token,
        refresh_token: refresh.token,
        user: LoginUser {
            id: user.uuid,
            name: user.name,
            email: user.email,
            role: user.role,
        },
    }))
}

#[derive(Deserialize)]
struct RefreshRequest {
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

async fn refresh(
    State(state): State<AuthState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = payload
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::missing_token("No token provided"))?;

    // Expired, malformed, and forged tokens all surface as one generic
    // signal; callers are not told which.
    let claims = state
        .tokens
        .validate_refresh(&token)
        .map_err(|_| ApiError::invalid_token("Invalid or expired refresh token"))?;

    let user = state
        .db
        .users()
        .find_by_uuid(&claims.sub)
        .await
        .db_err("Failed to look up user")?;

    // Revocation check: the presented token must equal the stored value.
    // A signature-valid token that was rotated away or logged out fails here.
    let user = match user {
        Some(u) if u.refresh_token.as_deref() == Some(token.as_str()) => u,
        _ => return Err(ApiError::invalid_token("Invalid refresh token")),
    };

    if user.is_blocked {
        // Force the session to NONE so the token is dead even after unblock.
        state
            .db
            .users()
            .clear_refresh_token(&user.uuid)
            .await
            .db_err("Failed to clear refresh token")?;
        return Err(ApiError::blocked(
            "Your account is blocked, please login again after unblock",
        ));
    }

    // Only a new access token is issued; the refresh token is replaced
    // wholesale at the next login, not rotated here.
    let access = state
        .tokens
        .issue_access(&user.uuid)
        .internal_err("Failed to generate access token")?;

    Ok(Json(RefreshResponse {
        access_token: access.token,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogoutRequest {
    user_id: Option<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn logout(
    State(state): State<AuthState>,
    Json(payload): Json<LogoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = payload
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::validation("User ID is required to logout"))?;

    // Idempotent: clearing an empty slot or an unknown id still succeeds.
    state
        .db
        .users()
        .clear_refresh_token(&user_id)
        .await
        .db_err("Failed to clear refresh token")?;

    Ok(Json(MessageResponse {
        message: "Logout successful",
    }))
}
