/// Error taxonomy for the authentication use cases
///
/// Every engine operation surfaces one of these typed variants; the HTTP
/// boundary maps them onto transport responses. Validation and lookup
/// failures are returned immediately — no retries happen inside the core.
///
/// # Anti-enumeration
///
/// `NotFound` deliberately conflates "no such email" and "wrong password":
/// login never reveals which half of the credential pair was wrong, so an
/// attacker cannot probe for account existence.

use crate::store::StoreError;

/// Typed failure of an authentication use case
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Malformed or too-short input field (client error)
    #[error("{0}")]
    InvalidInput(String),

    /// Duplicate email or username at creation time (client error)
    #[error("{0} already taken")]
    Conflict(String),

    /// Unknown credential pairing or missing user (client error)
    ///
    /// Deliberately indistinguishable from "wrong password".
    #[error("user not found")]
    NotFound,

    /// Session token not recognized as live (client error)
    #[error("session token is no longer active")]
    Forbidden,

    /// Missing or invalid bearer credential at the boundary
    #[error("missing or invalid credentials")]
    Unauthorized,

    /// Identity-provider exchange failed (client-attributable but external)
    #[error("identity provider exchange failed: {0}")]
    UpstreamAuthFailure(String),

    /// Backing store unreachable or timed out (server-side, retryable)
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invariant violation inside the core (server-side, fatal)
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Conflict(what) => AuthError::Conflict(what),
            StoreError::Unavailable(detail) => AuthError::StoreUnavailable(detail),
        }
    }
}
