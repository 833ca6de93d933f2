//! Server middleware.

pub mod auth;

pub use auth::{require_session, CurrentUser, SESSION_COOKIE};
