//! Authentication for Trove.
//!
//! Password hashing (argon2) and cookie-backed browser sessions. Sessions
//! are persisted through a pluggable [`SessionStore`] so logins survive
//! server restarts.

mod error;
mod password;
mod session;
mod store;

pub use error::*;
pub use password::*;
pub use session::*;
pub use store::*;

/// Default session lifetime in hours.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 14;
