/// User directory: records, uniqueness checks, and the access-token field
///
/// A user is either local (password credentials) or federated (third-party
/// identity); every user has at least one of the two. The single
/// `current_access_token` column implements the "at most one valid access
/// token per user" rule — every mint overwrites it, implicitly
/// invalidating the predecessor.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     user_id UUID PRIMARY KEY,
///     username TEXT NOT NULL UNIQUE,
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT,
///     password_salt TEXT,
///     federated_id TEXT UNIQUE,
///     current_access_token TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use keygate_shared::store::users::{NewLocalUser, PgUserDirectory, UserDirectory};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let directory = PgUserDirectory::new(pool);
///
/// let user_id = directory
///     .create_local(NewLocalUser {
///         username: "validuser".to_string(),
///         email: "a@example.com".to_string(),
///         password_hash: "…hex…".to_string(),
///         password_salt: "…hex…".to_string(),
///     })
///     .await?;
///
/// let user = directory.find_by_user_id(user_id).await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::StoreError;

/// One account in the directory
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Opaque unique identifier, immutable
    pub user_id: Uuid,

    /// Unique, case-sensitive; defaults to the email for federated accounts
    pub username: String,

    /// Unique across the directory, local and federated alike
    pub email: String,

    /// Hex-encoded PBKDF2 hash; absent for pure-federated accounts
    pub password_hash: Option<String>,

    /// Hex-encoded salt; absent for pure-federated accounts
    pub password_salt: Option<String>,

    /// Third-party subject id; absent for local accounts
    pub federated_id: Option<String>,

    /// The single most-recently-issued access token, overwritten on every
    /// mint — older access tokens are implicitly invalidated
    pub current_access_token: Option<String>,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether this account can authenticate with a password
    pub fn has_password_credentials(&self) -> bool {
        self.password_hash.is_some() && self.password_salt.is_some()
    }
}

/// Input for creating a local (password) account
#[derive(Debug, Clone)]
pub struct NewLocalUser {
    pub username: String,
    pub email: String,
    /// Hex-encoded PBKDF2 hash (never a plaintext password)
    pub password_hash: String,
    /// Hex-encoded salt
    pub password_salt: String,
}

/// Persistence contract for user records
///
/// All mutation goes through these named operations to keep the invariant
/// set closed; no arbitrary update or delete is exposed.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds a user by email, `None` if absent
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Finds a user by id, `None` if absent
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    /// Finds a user by third-party subject id, `None` if absent
    async fn find_by_federated_id(&self, federated_id: &str)
        -> Result<Option<User>, StoreError>;

    /// Pre-insert guard: is this email already reserved?
    async fn is_email_taken(&self, email: &str) -> Result<bool, StoreError>;

    /// Pre-insert guard: is this username already reserved?
    async fn is_username_taken(&self, username: &str) -> Result<bool, StoreError>;

    /// Creates a local account, returning its new id
    async fn create_local(&self, user: NewLocalUser) -> Result<Uuid, StoreError>;

    /// Creates a federated account (username defaults to the email),
    /// returning its new id
    async fn create_federated(
        &self,
        email: &str,
        federated_id: &str,
    ) -> Result<Uuid, StoreError>;

    /// Overwrites the current access token field
    async fn set_access_token(&self, user_id: Uuid, token: &str) -> Result<(), StoreError>;
}

/// PostgreSQL-backed user directory
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Creates a directory backed by the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, email, password_hash, password_salt,
                   federated_id, current_access_token, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, email, password_hash, password_salt,
                   federated_id, current_access_token, created_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_federated_id(
        &self,
        federated_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, email, password_hash, password_salt,
                   federated_id, current_access_token, created_at
            FROM users
            WHERE federated_id = $1
            "#,
        )
        .bind(federated_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn is_email_taken(&self, email: &str) -> Result<bool, StoreError> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(taken)
    }

    async fn is_username_taken(&self, username: &str) -> Result<bool, StoreError> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;

        Ok(taken)
    }

    async fn create_local(&self, user: NewLocalUser) -> Result<Uuid, StoreError> {
        let user_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, email, password_hash, password_salt)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.password_salt)
        .execute(&self.pool)
        .await?;

        Ok(user_id)
    }

    async fn create_federated(
        &self,
        email: &str,
        federated_id: &str,
    ) -> Result<Uuid, StoreError> {
        let user_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, email, federated_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(email)
        .bind(federated_id)
        .execute(&self.pool)
        .await?;

        Ok(user_id)
    }

    async fn set_access_token(&self, user_id: Uuid, token: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET current_access_token = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(hash: Option<&str>, salt: Option<&str>, federated: Option<&str>) -> User {
        User {
            user_id: Uuid::new_v4(),
            username: "validuser".to_string(),
            email: "a@example.com".to_string(),
            password_hash: hash.map(String::from),
            password_salt: salt.map(String::from),
            federated_id: federated.map(String::from),
            current_access_token: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_has_password_credentials() {
        assert!(sample_user(Some("h"), Some("s"), None).has_password_credentials());
        assert!(!sample_user(None, None, Some("google-sub")).has_password_credentials());
        // Hash without salt is not a usable credential
        assert!(!sample_user(Some("h"), None, None).has_password_credentials());
    }
}
