//! Profile endpoints for the authenticated user.
//!
//! - GET `/profile` - Fetch the caller's own account
//! - PUT `/profile` - Update name/email, change password, upload an avatar
//!
//! The update endpoint is multipart so the avatar can ride along with the
//! text fields in a single request.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::Auth;
use crate::db::{Database, UserSummary};
use crate::impl_has_auth_state;
use crate::jwt::TokenIssuer;
use crate::password::{hash_password, verify_password};
use crate::uploads::{self, MAX_AVATAR_BYTES, UploadError};

#[derive(Clone)]
pub struct ProfileState {
    pub db: Database,
    pub tokens: Arc<TokenIssuer>,
    pub uploads_dir: PathBuf,
}

impl_has_auth_state!(ProfileState);

pub fn router(state: ProfileState) -> Router {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        // Headroom over the avatar cap for multipart framing and text fields.
        .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 64 * 1024))
        .with_state(state)
}

async fn get_profile(
    auth: Auth,
    State(state): State<ProfileState>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .find_by_uuid(&auth.0.sub)
        .await
        .db_err("Failed to load profile")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserSummary::from(user)))
}

/// Text fields and the optional image collected off the multipart stream.
#[derive(Default)]
struct ProfileUpdate {
    name: Option<String>,
    email: Option<String>,
    current_password: Option<String>,
    new_password: Option<String>,
    image: Option<AvatarPart>,
}

struct AvatarPart {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

async fn collect_update(mut multipart: Multipart) -> Result<ProfileUpdate, ApiError> {
    let mut update = ProfileUpdate::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::validation("Invalid multipart payload"))?
    {
        match field.name().unwrap_or("") {
            "name" => {
                update.name = Some(field.text().await.map_err(bad_part)?);
            }
            "email" => {
                update.email = Some(field.text().await.map_err(bad_part)?);
            }
            "currentPassword" => {
                update.current_password = Some(field.text().await.map_err(bad_part)?);
            }
            "newPassword" => {
                update.new_password = Some(field.text().await.map_err(bad_part)?);
            }
            "image" => {
                let filename = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(bad_part)?;
                update.image = Some(AvatarPart {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            // Unknown fields are ignored, matching lenient form handling.
            _ => {}
        }
    }

    Ok(update)
}

fn bad_part(_: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::validation("Invalid multipart payload")
}

#[derive(Serialize)]
struct ProfileResponse {
    message: &'static str,
    user: UserSummary,
}

async fn update_profile(
    auth: Auth,
    State(state): State<ProfileState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let update = collect_update(multipart).await?;

    let user = state
        .db
        .users()
        .find_by_uuid(&auth.0.sub)
        .await
        .db_err("Failed to load profile")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // Name/email: either may be supplied alone; the other keeps its value.
    let name = match update.name.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::validation("Name cannot be empty")),
        Some(n) => n.to_string(),
        None => user.name.clone(),
    };
    let email = match update.email.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::validation("Email cannot be empty")),
        Some(e) => e.to_string(),
        None => user.email.clone(),
    };

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

    // Password change requires re-proving the current password.
    if let Some(new_password) = update.new_password.filter(|p| !p.is_empty()) {
        let current = update
            .current_password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::validation("Current password is required"))?;

        let matches = verify_password(&current, &user.password_hash)
            .internal_err("Failed to verify password")?;
        if !matches {
            return Err(ApiError::invalid_credentials("Current password is incorrect"));
        }

        let hash = hash_password(&new_password).internal_err("Failed to hash password")?;
        state
            .db
            .users()
            .set_password_hash(&user.uuid, &hash)
            .await
            .db_err("Failed to update password")?;
    }

    if let Some(avatar) = update.image {
        let public_path = uploads::store_avatar(
            &state.uploads_dir,
            &user.uuid,
            &avatar.filename,
            &avatar.content_type,
            &avatar.bytes,
        )
        .map_err(|e| match e {
            UploadError::UnsupportedType(_) => {
                ApiError::validation("Only image files (jpeg, png, gif, webp) are allowed")
            }
            UploadError::TooLarge(_) => ApiError::validation("Image must be 5MB or smaller"),
            UploadError::Io(e) => {
                tracing::error!(error = %e, "Failed to store avatar");
                ApiError::internal("Failed to store image")
            }
        })?;

        if let Some(old) = &user.profile_image {
            uploads::remove_avatar(&state.uploads_dir, old);
        }

        state
            .db
            .users()
            .set_profile_image(&user.uuid, &public_path)
            .await
            .db_err("Failed to update profile image")?;
    }

    state
        .db
        .users()
        .update_name_email(&user.uuid, &name, &email)
        .await
        .db_err("Failed to update profile")?;

    info!(user = %user.uuid, "Profile updated");

    let updated = state
        .db
        .users()
        .find_by_uuid(&user.uuid)
        .await
        .db_err("Failed to reload profile")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse {
        message: "Profile updated successfully",
        user: UserSummary::from(updated),
    }))
}
