//! Bearer-token authentication with a single admin authorization boundary.
//!
//! Dual-token system: short-lived access tokens (15 min, stateless) and a
//! long-lived refresh token (7 days) persisted on the user record, one per
//! account. Access-token validation never touches the database; revocation
//! happens at the refresh gate.

mod bearer;
mod errors;
mod extractors;
mod state;

pub use bearer::bearer_token;
pub use errors::AuthError;
pub use extractors::{AdminAuth, Auth};
pub use state::HasAuthState;
