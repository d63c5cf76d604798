//! Authentication state trait and macro.

use crate::db::Database;
use crate::jwt::TokenIssuer;

/// Trait for state types that provide token validation and database access
/// for authentication.
pub trait HasAuthState {
    fn tokens(&self) -> &TokenIssuer;
    fn db(&self) -> &Database;
}

/// Implement `HasAuthState` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `tokens: Arc<TokenIssuer>`
/// - `db: Database`
#[macro_export]
macro_rules! impl_has_auth_state {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthState for $state_type {
            fn tokens(&self) -> &$crate::jwt::TokenIssuer {
                &self.tokens
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
        }
    };
}
