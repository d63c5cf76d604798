//! HTTP API surface.
//!
//! Three route groups, each with its own state struct:
//! - `/auth` - session lifecycle (public)
//! - `/users` - the caller's own profile (access token required)
//! - `/admin` - account management (admin role required)

pub mod admin;
pub mod auth;
pub mod error;
pub mod users;

use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::TokenIssuer;

pub use error::ApiError;

/// Build the `/api` router.
pub fn create_api_router(db: Database, tokens: Arc<TokenIssuer>, uploads_dir: PathBuf) -> Router {
    Router::new()
        .nest(
            "/auth",
            auth::router(auth::AuthState {
                db: db.clone(),
                tokens: tokens.clone(),
            }),
        )
        .nest(
            "/users",
            users::router(users::ProfileState {
                db: db.clone(),
                tokens: tokens.clone(),
                uploads_dir,
            }),
        )
        .nest("/admin", admin::router(admin::AdminState { db, tokens }))
}
