/// Authentication core for Keygate
///
/// This module provides the credential and token lifecycle primitives:
///
/// # Modules
///
/// - [`password`]: PBKDF2-HMAC-SHA256 password hashing and verification
/// - [`token`]: Signed, expiring token minting and parsing (HS256)
/// - [`engine`]: The register / login / renew / federated-login use cases
/// - [`federated`]: Authorization-code exchange against an identity provider
/// - [`middleware`]: Bearer extraction for session-token renewal
/// - [`error`]: The error taxonomy shared by all use cases
///
/// # Security Notes
///
/// - Passwords are hashed with PBKDF2-HMAC-SHA256 (260,000 iterations,
///   16-byte random salt) and verified in constant time.
/// - Tokens are HS256-signed with a single process-wide secret. Signature
///   validity and temporal validity are deliberately separate: `parse`
///   never rejects an expired token, callers compare `exp` themselves.
///
/// # Example
///
/// ```no_run
/// use keygate_shared::auth::password::{hash_password, verify_password};
/// use keygate_shared::auth::token::TokenCodec;
/// use chrono::{Duration, Utc};
///
/// let (salt, hash) = hash_password("a-long-enough-password");
/// assert!(verify_password("a-long-enough-password", &hash, &salt));
///
/// let codec = TokenCodec::new("secret-key-at-least-32-bytes-long!!");
/// let token = codec.mint("subject", Utc::now() + Duration::minutes(30)).unwrap();
/// assert!(codec.is_valid(&token));
/// ```

pub mod engine;
pub mod error;
pub mod federated;
pub mod middleware;
pub mod password;
pub mod token;
