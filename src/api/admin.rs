//! Admin endpoints: account management for non-admin users.
//!
//! Every route sits behind the `AdminAuth` extractor; role checks live
//! there and nowhere else.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::AdminAuth;
use crate::db::{Database, UserRole, UserSummary};
use crate::impl_has_auth_state;
use crate::jwt::TokenIssuer;
use crate::password::hash_password;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 5;

#[derive(Clone)]
pub struct AdminState {
    pub db: Database,
    pub tokens: Arc<TokenIssuer>,
}

impl_has_auth_state!(AdminState);

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/search", get(search_users))
        .route("/add", post(add_user))
        .route("/block/{id}", put(block_user))
        .route("/unblock/{id}", put(unblock_user))
        .route("/update-user/{id}", put(update_user))
        .route("/update/{id}", put(update_admin))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    keyword: Option<String>,
    /// Sent by clients as the strings "true"/"false"; anything else means
    /// no filter.
    is_blocked: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    total: i64,
    page: u32,
    limit: u32,
    total_pages: i64,
}

#[derive(Serialize)]
struct ListResponse {
    users: Vec<UserSummary>,
    pagination: Pagination,
}

async fn list_users(
    _admin: AdminAuth,
    State(state): State<AdminState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.unwrap_or(DEFAULT_PAGE).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).max(1);
    let keyword = query.keyword.unwrap_or_default();
    let blocked = match query.is_blocked.as_deref() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    };

    let users = state
        .db
        .users()
        .list_non_admins(&keyword, blocked, page, limit)
        .await
        .db_err("Failed to list users")?;
    let total = state
        .db
        .users()
        .count_non_admins(&keyword, blocked)
        .await
        .db_err("Failed to count users")?;

    let total_pages = (total + limit as i64 - 1) / limit as i64;

    Ok(Json(ListResponse {
        users,
        pagination: Pagination {
            total,
            page,
            limit,
            total_pages,
        },
    }))
}

#[derive(Deserialize)]
struct SearchQuery {
    keyword: Option<String>,
}

async fn search_users(
    _admin: AdminAuth,
    State(state): State<AdminState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let keyword = query.keyword.unwrap_or_default();
    if keyword.trim().is_empty() {
        return Err(ApiError::validation("Keyword is required"));
    }

    let users = state
        .db
        .users()
        .search_non_admins(keyword.trim())
        .await
        .db_err("Failed to search users")?;

    Ok(Json(users))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddUserRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    is_blocked: Option<bool>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct UserResponse {
    message: &'static str,
    user: UserSummary,
}

async fn add_user(
    admin: AdminAuth,
    State(state): State<AdminState>,
    Json(payload): Json<AddUserRequest>,
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
    let is_blocked = payload.is_blocked.unwrap_or(false);

    state
        .db
        .users()
        .create(&uuid, &name, &email, &password_hash, UserRole::User, is_blocked)
        .await
        .db_err("Failed to create user")?;

    info!(admin = %admin.0.uuid, user = %uuid, "Admin added user");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User added successfully",
        }),
    ))
}

async fn block_user(
    admin: AdminAuth,
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .find_by_uuid(&id)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if user.role == UserRole::Admin {
        return Err(ApiError::forbidden("Cannot block an admin account"));
    }

    state
        .db
        .users()
        .set_blocked(&user.uuid, true)
        .await
        .db_err("Failed to block user")?;

    info!(admin = %admin.0.uuid, user = %user.uuid, "User blocked");

    Ok(Json(MessageResponse {
        message: "User blocked successfully",
    }))
}

async fn unblock_user(
    admin: AdminAuth,
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .find_by_uuid(&id)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if user.role == UserRole::Admin {
        return Err(ApiError::forbidden("Cannot unblock an admin account"));
    }

    state
        .db
        .users()
        .set_blocked(&user.uuid, false)
        .await
        .db_err("Failed to unblock user")?;

    info!(admin = %admin.0.uuid, user = %user.uuid, "User unblocked");

    Ok(Json(MessageResponse {
        message: "User unblocked successfully",
    }))
}

#[derive(Deserialize)]
struct UpdateUserRequest {
    name: Option<String>,
    email: Option<String>,
}

async fn update_user(
    _admin: AdminAuth,
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(name), Some(email)) = (payload.name, payload.email) else {
        return Err(ApiError::validation("Name and email are required"));
    };
    let name = name.trim().to_string();
    let email = email.trim().to_string();
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::validation("Name and email are required"));
    }

    let user = state
        .db
        .users()
        .find_by_uuid(&id)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if user.role == UserRole::Admin {
        return Err(ApiError::forbidden("Cannot update an admin account"));
    }

    if email != user.email {
        let taken = state
            .db
            .users()
            .email_taken_by_other(&email, &user.uuid)
            .await
            .db_err("Failed to check email uniqueness")?;
        if taken {
            return Err(ApiError::duplicate_email("Email already in use"));
        }
    }

    state
        .db
        .users()
        .update_name_email(&user.uuid, &name, &email)
        .await
        .db_err("Failed to update user")?;

    let updated = state
        .db
        .users()
        .find_by_uuid(&user.uuid)
        .await
        .db_err("Failed to reload user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserResponse {
        message: "User updated successfully",
        user: UserSummary::from(updated),
    }))
}

async fn update_admin(
    _admin: AdminAuth,
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(name), Some(email)) = (payload.name, payload.email) else {
        return Err(ApiError::validation("Name and email are required"));
    };
    let name = name.trim().to_string();
    let email = email.trim().to_string();
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::validation("Name and email are required"));
    }

    // This route only updates admin accounts; a user id here is a 404.
    let target = state
        .db
        .users()
        .find_by_uuid(&id)
        .await
        .db_err("Failed to look up admin")?
        .filter(|u| u.role == UserRole::Admin)
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;

    if email != target.email {
        let taken = state
            .db
            .users()
            .email_taken_by_other(&email, &target.uuid)
            .await
            .db_err("Failed to check email uniqueness")?;
        if taken {
            return Err(ApiError::duplicate_email("Email already in use"));
        }
    }

    state
        .db
        .users()
        .update_name_email(&target.uuid, &name, &email)
        .await
        .db_err("Failed to update admin")?;

    let updated = state
        .db
        .users()
        .find_by_uuid(&target.uuid)
        .await
        .db_err("Failed to reload admin")?
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;

    Ok(Json(UserResponse {
        message: "Admin updated successfully",
        user: UserSummary::from(updated),
    }))
}
