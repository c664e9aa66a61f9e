/// Authentication engine: the register / login / renew / federated-login
/// use cases
///
/// The engine is stateless per request. It holds the store contracts, the
/// token codec, and (optionally) an identity-provider exchange, all wired
/// by explicit dependency injection. It owns the two algorithms the stores
/// deliberately do not:
///
/// - **Session eviction**: at most 5 live session tokens per user. Before
///   each insert that would exceed the cap, the record with the least
///   residual TTL is deleted — "replace the token closest to expiring",
///   not LRU.
/// - **Federated reconciliation**: a provider profile is matched to a user
///   by `federated_id`; first login creates the user, later logins reuse
///   it.
///
/// The count→evict→insert sequence is not atomic: two concurrent logins
/// for one user can interleave their eviction decisions and transiently
/// exceed the cap. Documented race; a stricter deployment may wrap the
/// sequence in a per-user transaction.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use keygate_shared::auth::engine::AuthEngine;
/// use keygate_shared::auth::token::TokenCodec;
/// use keygate_shared::store::memory::{InMemorySessionStore, InMemoryUserDirectory};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = AuthEngine::new(
///     Arc::new(InMemoryUserDirectory::new()),
///     Arc::new(InMemorySessionStore::new()),
///     TokenCodec::new("secret-key-at-least-32-bytes-long!!"),
/// );
///
/// let user_id = engine
///     .register("validuser", "a@example.com", "at-least-12-chars-pw")
///     .await?;
/// let tokens = engine.login("a@example.com", "at-least-12-chars-pw").await?;
/// assert_eq!(tokens.token_type, "Bearer");
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::store::users::NewLocalUser;
use crate::store::{SessionStore, SessionToken, StoreError, UserDirectory};

use super::error::AuthError;
use super::federated::IdentityExchange;
use super::password::{hash_password, verify_password};
use super::token::{ttl_seconds, TokenClaims, TokenCodec};

/// Access token lifetime: 30 minutes
pub const ACCESS_TOKEN_TTL_SECS: i64 = 30 * 60;

/// Session token lifetime: 7 days
pub const SESSION_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

/// Maximum live session tokens per user
pub const MAX_SESSIONS_PER_USER: usize = 5;

/// Minimum username length for registration
const MIN_USERNAME_CHARS: usize = 6;

/// Minimum password length for registration
const MIN_PASSWORD_CHARS: usize = 12;

/// Tokens issued by a successful login, renewal, or federated login
///
/// Ephemeral — never persisted as a record. `access_expires_in` is the
/// remaining access-token lifetime in whole seconds, never negative.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedTokens {
    /// Short-lived credential granting API access
    pub access_token: String,

    /// Long-lived credential used solely to mint new access tokens;
    /// renewal returns the caller's own session token unchanged
    pub session_token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// Seconds until the access token expires
    pub access_expires_in: i64,
}

/// The caller's verified session-token context for renewal
///
/// Produced by the boundary layer after signature verification and passed
/// explicitly — never read from ambient state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// The raw session token string as presented by the client
    pub token: String,

    /// The signature-verified claim set of that token
    pub claims: TokenClaims,
}

/// Orchestrates hashing, token minting, and the store contracts
pub struct AuthEngine {
    users: Arc<dyn UserDirectory>,
    sessions: Arc<dyn SessionStore>,
    codec: TokenCodec,
    identity: Option<Arc<dyn IdentityExchange>>,
}

impl AuthEngine {
    /// Creates an engine without a federated identity provider
    ///
    /// Federated login fails closed until
    /// [`with_identity_exchange`](Self::with_identity_exchange) wires one.
    pub fn new(
        users: Arc<dyn UserDirectory>,
        sessions: Arc<dyn SessionStore>,
        codec: TokenCodec,
    ) -> Self {
        Self {
            users,
            sessions,
            codec,
            identity: None,
        }
    }

    /// Wires an identity-provider exchange, enabling federated login
    pub fn with_identity_exchange(mut self, identity: Arc<dyn IdentityExchange>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Registers a local (password) account
    ///
    /// Validation order: username length, password length, email taken,
    /// username taken. No token is issued on registration.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` — username shorter than 6 or password shorter
    ///   than 12 characters
    /// - `Conflict("email")` / `Conflict("username")` — already reserved
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Uuid, AuthError> {
        if username.chars().count() < MIN_USERNAME_CHARS {
            return Err(AuthError::InvalidInput(
                "username must be at least 6 characters".to_string(),
            ));
        }

        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::InvalidInput(
                "password must be at least 12 characters".to_string(),
            ));
        }

        if self.users.is_email_taken(email).await? {
            return Err(AuthError::Conflict("email".to_string()));
        }

        if self.users.is_username_taken(username).await? {
            return Err(AuthError::Conflict("username".to_string()));
        }

        let (salt, hash) = hash_password(password);

        let user_id = self
            .users
            .create_local(NewLocalUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: hash,
                password_salt: salt,
            })
            .await?;

        tracing::info!(%user_id, "registered local user");

        Ok(user_id)
    }

    /// Authenticates a local account and issues both tokens
    ///
    /// # Errors
    ///
    /// `NotFound` — unknown email OR wrong password OR an account without
    /// password credentials; the three are deliberately indistinguishable
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedTokens, AuthError> {
        let user = self.users.find_by_email(email).await?;

        let user = match user {
            Some(user) => user,
            None => return Err(AuthError::NotFound),
        };

        let verified = match (&user.password_hash, &user.password_salt) {
            (Some(hash), Some(salt)) => verify_password(password, hash, salt),
            _ => false,
        };

        if !verified {
            return Err(AuthError::NotFound);
        }

        self.issue_tokens(user.user_id).await
    }

    /// Mints a fresh access token against a live session
    ///
    /// The session token itself is not rotated; the result is bound to the
    /// caller's own session token.
    ///
    /// # Errors
    ///
    /// - `Forbidden` — the session token is validly signed but no longer
    ///   in the store (evicted or revoked out-of-band)
    /// - `NotFound` — the owning user record has disappeared
    pub async fn renew(&self, ctx: &SessionContext) -> Result<IssuedTokens, AuthError> {
        if !self.sessions.exists(&ctx.token).await? {
            return Err(AuthError::Forbidden);
        }

        let user_id = Uuid::parse_str(&ctx.claims.sub).map_err(|_| {
            AuthError::InternalError("session token carried a malformed subject".to_string())
        })?;

        let user = self
            .users
            .find_by_user_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let access_expires_at = Utc::now() + Duration::seconds(ACCESS_TOKEN_TTL_SECS);
        let access_token = self.mint_for(user.user_id, access_expires_at)?;
        self.users
            .set_access_token(user.user_id, &access_token)
            .await?;

        Ok(IssuedTokens {
            access_token,
            session_token: ctx.token.clone(),
            token_type: "Bearer".to_string(),
            access_expires_in: ttl_seconds(access_expires_at),
        })
    }

    /// Authenticates via the federated identity provider and issues both
    /// tokens, creating the user on first login
    ///
    /// # Errors
    ///
    /// - `UpstreamAuthFailure` — provider exchange failed, or no provider
    ///   is configured (federated login fails closed)
    /// - `InternalError` — user creation succeeded but the immediate
    ///   re-read did not
    pub async fn federated_login(&self, code: &str) -> Result<IssuedTokens, AuthError> {
        let identity = self.identity.as_ref().ok_or_else(|| {
            AuthError::UpstreamAuthFailure("identity provider is not configured".to_string())
        })?;

        let provider_token = identity.exchange_code(code).await?;
        let profile = identity.fetch_profile(&provider_token).await?;

        let user = match self.users.find_by_federated_id(&profile.federated_id).await? {
            Some(user) => user,
            None => {
                self.users
                    .create_federated(&profile.email, &profile.federated_id)
                    .await?;

                tracing::info!(federated_id = %profile.federated_id, "created federated user");

                self.users
                    .find_by_federated_id(&profile.federated_id)
                    .await?
                    .ok_or_else(|| {
                        AuthError::InternalError(
                            "federated user vanished immediately after creation".to_string(),
                        )
                    })?
            }
        };

        self.issue_tokens(user.user_id).await
    }

    /// Mints and persists a fresh access + session token pair
    ///
    /// The new access token overwrites the user's current one; the session
    /// token is admitted through the eviction policy and inserted.
    async fn issue_tokens(&self, user_id: Uuid) -> Result<IssuedTokens, AuthError> {
        let now = Utc::now();
        let access_expires_at = now + Duration::seconds(ACCESS_TOKEN_TTL_SECS);
        let session_expires_at = now + Duration::seconds(SESSION_TOKEN_TTL_SECS);

        let access_token = self.mint_for(user_id, access_expires_at)?;
        self.users.set_access_token(user_id, &access_token).await?;

        self.evict_if_at_cap(user_id).await?;

        let session_token = self.mint_for(user_id, session_expires_at)?;
        self.sessions
            .insert(SessionToken {
                token: session_token.clone(),
                user_id,
                expires_at: session_expires_at,
            })
            .await?;

        Ok(IssuedTokens {
            access_token,
            session_token,
            token_type: "Bearer".to_string(),
            access_expires_in: ttl_seconds(access_expires_at),
        })
    }

    /// Frees one session slot when the cap would be exceeded
    ///
    /// Selects the record with the smallest residual TTL (ties: first
    /// encountered in iteration order) and deletes it. A concurrent
    /// eviction may have already removed the victim; that is not a
    /// failure of this login.
    async fn evict_if_at_cap(&self, user_id: Uuid) -> Result<(), AuthError> {
        if self.sessions.count(user_id).await? < MAX_SESSIONS_PER_USER {
            return Ok(());
        }

        let sessions = self.sessions.list(user_id).await?;

        // Smallest expires_at == smallest residual TTL; "now" is the same
        // for every record under comparison
        let victim = sessions.into_iter().min_by_key(|s| s.expires_at);

        if let Some(victim) = victim {
            tracing::debug!(%user_id, "evicting session token closest to expiry");
            match self.sessions.delete(&victim.token).await {
                Ok(()) | Err(StoreError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    fn mint_for(
        &self,
        user_id: Uuid,
        expires_at: chrono::DateTime<Utc>,
    ) -> Result<String, AuthError> {
        self.codec
            .mint(&user_id.to_string(), expires_at)
            .map_err(|e| AuthError::InternalError(e.to_string()))
    }
}
