//! Client library for the account service.

mod interceptor;
mod session;

pub use interceptor::{ApiClient, ClientError};
pub use session::{SessionContext, SessionUser};
