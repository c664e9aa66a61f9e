/// Persistence contracts and implementations
///
/// The core mutates exactly two shared resources: the user directory and
/// the session store. Both are expressed as traits so the engine is wired
/// by explicit dependency injection — the Postgres implementations back
/// the server, the in-memory implementations back unit tests and local
/// development.
///
/// # Modules
///
/// - `users`: User records, uniqueness checks, the single access-token field
/// - `sessions`: Active session-token records per user
/// - `memory`: In-memory implementations of both contracts
///
/// All mutation is expressed as discrete single-record operations; no held
/// transactions. Store timeouts are enforced by the pool and surface as
/// [`StoreError::Unavailable`].

pub mod memory;
pub mod sessions;
pub mod users;

pub use sessions::{SessionStore, SessionToken};
pub use users::{User, UserDirectory};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced record does not exist
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write ("email", "username", ...)
    #[error("{0} already exists")]
    Conflict(String),

    /// The store could not be reached or the operation timed out
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => {
                // Unique constraint violations are a backstop behind the
                // engine's check-then-insert guards
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return StoreError::Conflict("email".to_string());
                    }
                    if constraint.contains("username") {
                        return StoreError::Conflict("username".to_string());
                    }
                    if constraint.contains("federated") {
                        return StoreError::Conflict("federated_id".to_string());
                    }
                }
                StoreError::Unavailable(db_err.to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}
