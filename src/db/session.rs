//! Durable session storage.
//!
//! Sessions are stored keyed by their opaque cookie token with a rolling
//! deadline. An expired row is indistinguishable from one that never
//! existed: both load as `None`. Expired rows are swept opportunistically
//! on every save.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

/// Per-session state, persisted as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    /// Authenticated user ID, set on login and scrubbed when the user
    /// no longer exists.
    pub user_id: Option<i64>,
    /// Per-session CSRF nonce, issued when the session is created.
    pub csrf_token: String,
    /// One-shot message shown on the next rendered page.
    pub flash: Option<String>,
}

#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load session data for a token. Absent and expired tokens both
    /// return `None`.
    pub async fn load(&self, token: &str) -> Result<Option<SessionData>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT data FROM sessions WHERE token = ? AND expires_at > datetime('now')",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json,)) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| sqlx::Error::Decode(Box::new(e))),
            None => Ok(None),
        }
    }

    /// Upsert session data with a fresh deadline `ttl_hours` from now.
    pub async fn save(
        &self,
        token: &str,
        data: &SessionData,
        ttl_hours: i64,
    ) -> Result<(), sqlx::Error> {
        // Sweep expired rows on every write
        self.delete_expired().await?;

        let json = serde_json::to_string(data).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        sqlx::query(
            "INSERT OR REPLACE INTO sessions (token, data, expires_at)
             VALUES (?, ?, datetime('now', '+' || ? || ' hours'))",
        )
        .bind(token)
        .bind(&json)
        .bind(ttl_hours)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a session outright (logout-everything semantics).
    pub async fn destroy(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rotate a session's token while preserving its data. Used after
    /// privilege changes to defeat session fixation.
    pub async fn renew_token(&self, old: &str, new: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE sessions SET token = ? WHERE token = ?")
            .bind(new)
            .bind(old)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove all expired sessions.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
