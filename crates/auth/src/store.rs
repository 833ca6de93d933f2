//! Session storage
//!
//! This module provides storage backends for browser sessions. Supports both
//! in-memory (for testing) and SQLite (for production) storage.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::{AuthError, AuthResult, Session};

/// Trait for session storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a session
    async fn store(&self, session: &Session) -> AuthResult<()>;

    /// Retrieve a session by token. Expired sessions are not returned.
    async fn get(&self, token: &str) -> AuthResult<Option<Session>>;

    /// Remove a session (logout)
    async fn remove(&self, token: &str) -> AuthResult<()>;

    /// Remove expired sessions (cleanup task)
    ///
    /// Returns the number of sessions removed.
    async fn cleanup_expired(&self) -> AuthResult<usize>;
}

/// In-memory session store (for testing and ephemeral runs)
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn store(&self, session: &Session) -> AuthResult<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| AuthError::Store(format!("Lock poisoned: {}", e)))?;
        sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, token: &str) -> AuthResult<Option<Session>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| AuthError::Store(format!("Lock poisoned: {}", e)))?;
        Ok(sessions.get(token).filter(|s| !s.is_expired()).cloned())
    }

    async fn remove(&self, token: &str) -> AuthResult<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| AuthError::Store(format!("Lock poisoned: {}", e)))?;
        sessions.remove(token);
        Ok(())
    }

    async fn cleanup_expired(&self) -> AuthResult<usize> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| AuthError::Store(format!("Lock poisoned: {}", e)))?;
        let before_count = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok(before_count - sessions.len())
    }
}

#[cfg(feature = "sqlx")]
pub use sqlx_store::*;

#[cfg(feature = "sqlx")]
mod sqlx_store {
    use super::*;
    use chrono::{DateTime, Utc};
    use sqlx::{Pool, Sqlite};

    /// SQLite session store (for persistent deployments)
    #[derive(Clone)]
    pub struct SqliteSessionStore {
        pool: Pool<Sqlite>,
    }

    impl SqliteSessionStore {
        /// Create a new SQLite store
        pub fn new(pool: Pool<Sqlite>) -> Self {
            Self { pool }
        }

        /// Initialize the database table
        pub async fn init(&self) -> AuthResult<()> {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS sessions (
                    token TEXT PRIMARY KEY,
                    user_token TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    expires_at TEXT NOT NULL
                )
                "#,
            )
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("Failed to create sessions table: {}", e)))?;

            sqlx::query(
                r#"
                CREATE INDEX IF NOT EXISTS idx_sessions_expires_at
                ON sessions (expires_at)
                "#,
            )
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("Failed to create index: {}", e)))?;

            Ok(())
        }
    }

    fn parse_ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    #[async_trait]
    impl SessionStore for SqliteSessionStore {
        async fn store(&self, session: &Session) -> AuthResult<()> {
            sqlx::query(
                "INSERT OR REPLACE INTO sessions (token, user_token, created_at, expires_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&session.token)
            .bind(&session.user_token)
            .bind(session.created_at.to_rfc3339())
            .bind(session.expires_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
            Ok(())
        }

        async fn get(&self, token: &str) -> AuthResult<Option<Session>> {
            let row: Option<(String, String, String, String)> = sqlx::query_as(
                "SELECT token, user_token, created_at, expires_at FROM sessions WHERE token = ?",
            )
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

            Ok(row
                .map(|(token, user_token, created_at, expires_at)| Session {
                    token,
                    user_token,
                    created_at: parse_ts(&created_at),
                    expires_at: parse_ts(&expires_at),
                })
                .filter(|s| !s.is_expired()))
        }

        async fn remove(&self, token: &str) -> AuthResult<()> {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;
            Ok(())
        }

        async fn cleanup_expired(&self) -> AuthResult<usize> {
            let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;
            let removed = result.rows_affected() as usize;
            if removed > 0 {
                tracing::debug!(removed, "Removed expired sessions");
            }
            Ok(removed)
        }
    }
}
