//! Browser session types.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

/// Length of a session token.
const SESSION_TOKEN_LEN: usize = 32;

/// A logged-in browser session. The token travels in a cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Random session token.
    pub token: String,
    /// Token of the logged-in user.
    pub user_token: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new session for a user with the given lifetime.
    pub fn new(user_token: impl Into<String>, ttl_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            token: generate_session_token(),
            user_token: user_token.into(),
            created_at: now,
            expires_at: now + Duration::hours(ttl_hours),
        }
    }

    /// Returns true if the session has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Generates a random session token.
fn generate_session_token() -> String {
    let mut rng = rand::rng();
    (0..SESSION_TOKEN_LEN)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect()
}
