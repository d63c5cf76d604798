//! Client-side session state.
//!
//! The session is an explicit value with a defined lifecycle: created by
//! login (or `restore_session`), its access token replaced by a successful
//! refresh, and destroyed by logout or a forced logout. Nothing ambient.

use serde::{Deserialize, Serialize};

/// The user identity returned by login, kept for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Everything the client holds for an authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub access_token: String,
    pub refresh_token: String,
    pub user: SessionUser,
}
