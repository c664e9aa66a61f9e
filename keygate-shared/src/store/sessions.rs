/// Session token store: active long-lived sessions per user
///
/// A session token record is keyed by the signed token string itself. The
/// store is a plain record container — admission control (the cap of 5
/// concurrent sessions per user and the least-residual-TTL eviction) is
/// executed by the engine BEFORE insert, not inside the store.
///
/// Expired records are not swept proactively; staleness is evaluated
/// lazily by readers comparing `expires_at` to the current time.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE session_tokens (
///     token TEXT PRIMARY KEY,
///     user_id UUID NOT NULL,
///     expires_at TIMESTAMPTZ NOT NULL
/// );
/// CREATE INDEX session_tokens_user_id_idx ON session_tokens (user_id);
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::StoreError;

/// One live, renewable login session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionToken {
    /// The signed token string — doubles as its own store key
    pub token: String,

    /// Owning user
    pub user_id: Uuid,

    /// Absolute expiry instant
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// Residual time-to-live in whole seconds, clamped at zero
    pub fn residual_ttl(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Persistence contract for session token records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Number of session records for a user
    async fn count(&self, user_id: Uuid) -> Result<usize, StoreError>;

    /// All session records for a user, unordered
    async fn list(&self, user_id: Uuid) -> Result<Vec<SessionToken>, StoreError>;

    /// Adds a session record; callers must have already merited admission
    async fn insert(&self, session: SessionToken) -> Result<(), StoreError>;

    /// Removes a session record, [`StoreError::NotFound`] if absent
    async fn delete(&self, token: &str) -> Result<(), StoreError>;

    /// Whether a session record exists for this token string
    async fn exists(&self, token: &str) -> Result<bool, StoreError>;
}

/// PostgreSQL-backed session store
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a store backed by the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn count(&self, user_id: Uuid) -> Result<usize, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM session_tokens WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count as usize)
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<SessionToken>, StoreError> {
        let sessions = sqlx::query_as::<_, SessionToken>(
            "SELECT token, user_id, expires_at FROM session_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn insert(&self, session: SessionToken) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO session_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM session_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn exists(&self, token: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM session_tokens WHERE token = $1)")
                .bind(token)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_residual_ttl() {
        let now = Utc::now();
        let session = SessionToken {
            token: "t".to_string(),
            user_id: Uuid::new_v4(),
            expires_at: now + Duration::days(7),
        };

        assert_eq!(session.residual_ttl(now), 7 * 24 * 3600);
    }

    #[test]
    fn test_residual_ttl_clamps_to_zero() {
        let now = Utc::now();
        let session = SessionToken {
            token: "t".to_string(),
            user_id: Uuid::new_v4(),
            expires_at: now - Duration::minutes(1),
        };

        assert_eq!(session.residual_ttl(now), 0);
    }
}
