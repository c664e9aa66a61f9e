/// Signed token minting and parsing
///
/// Tokens are compact three-part JWS strings (`header.payload.signature`)
/// signed with HMAC-SHA256 and a single process-wide secret. The claim set
/// is minimal: a subject and an expiry timestamp.
///
/// # Signature validity vs temporal validity
///
/// `parse` and `is_valid` check the signature ONLY. A correctly signed but
/// expired token still parses: callers own the comparison of the `exp`
/// claim against the current time. Renewal, for example, gates on the
/// session store rather than on `exp`, so that out-of-band revocation of a
/// still-validly-signed token is caught.
///
/// # Example
///
/// ```
/// use keygate_shared::auth::token::{ttl_seconds, TokenCodec};
/// use chrono::{Duration, Utc};
///
/// let codec = TokenCodec::new("test-secret-key-at-least-32-bytes-long");
/// let expires_at = Utc::now() + Duration::minutes(30);
///
/// let token = codec.mint("user-id", expires_at).unwrap();
/// let claims = codec.parse(&token).unwrap();
///
/// assert_eq!(claims.sub, "user-id");
/// assert!(ttl_seconds(claims.expires_at()) > 0);
/// ```

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signature verification or payload decoding failed
    #[error("token signature is invalid")]
    InvalidSignature,

    /// Failed to encode a new token
    #[error("failed to encode token: {0}")]
    Encode(String),
}

/// Claim set carried by every Keygate token
///
/// - `sub`: Subject — the owning user id for access tokens and session
///   tokens alike (the session token STRING is the opaque session key).
/// - `exp`: Expiration time (Unix seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl TokenClaims {
    /// Expiry instant carried by the claim set
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC)
    }
}

/// Encoder/decoder for HS256-signed tokens
///
/// Holds the process-wide signing secret, loaded once at startup. Absence
/// of the secret is a configuration failure handled before this type is
/// ever constructed.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    /// Creates a codec from the signing secret
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mints a signed token for a subject with an absolute expiry
    ///
    /// # Arguments
    ///
    /// * `sub` - Subject claim (user id)
    /// * `expires_at` - Absolute expiry instant
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if serialization fails
    pub fn mint(&self, sub: &str, expires_at: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: sub.to_string(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verifies the signature and decodes the claim set
    ///
    /// Expiry is NOT checked here; compare `claims.exp` to the current
    /// time at the call site.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidSignature` if the signature does not
    /// verify or the payload cannot be decoded
    pub fn parse(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::InvalidSignature)
    }

    /// True iff the token's signature verifies, independent of expiry
    pub fn is_valid(&self, token: &str) -> bool {
        self.parse(token).is_ok()
    }

    /// Decodes the expiry instant of a token
    pub fn expires_at(&self, token: &str) -> Result<DateTime<Utc>, TokenError> {
        Ok(self.parse(token)?.expires_at())
    }
}

/// Remaining lifetime of an expiry instant, in whole seconds
///
/// Wall-clock "now" at the instant of computation; a zero-or-negative
/// remainder is reported as 0, never negative.
///
/// # Example
///
/// ```
/// use keygate_shared::auth::token::ttl_seconds;
/// use chrono::{Duration, Utc};
///
/// assert_eq!(ttl_seconds(Utc::now() - Duration::hours(1)), 0);
/// assert!(ttl_seconds(Utc::now() + Duration::minutes(30)) > 0);
/// ```
pub fn ttl_seconds(expires_at: DateTime<Utc>) -> i64 {
    (expires_at - Utc::now()).num_seconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_mint_and_parse_roundtrip() {
        let codec = TokenCodec::new(SECRET);
        let expires_at = Utc::now() + Duration::minutes(30);

        let token = codec.mint("some-user-id", expires_at).unwrap();
        let claims = codec.parse(&token).unwrap();

        assert_eq!(claims.sub, "some-user-id");
        assert_eq!(claims.exp, expires_at.timestamp());
    }

    #[test]
    fn test_token_is_compact_three_part() {
        let codec = TokenCodec::new(SECRET);
        let token = codec
            .mint("sub", Utc::now() + Duration::minutes(5))
            .unwrap();

        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_parse_with_wrong_secret_fails() {
        let codec = TokenCodec::new(SECRET);
        let other = TokenCodec::new("another-secret-key-of-sufficient-len");

        let token = codec
            .mint("sub", Utc::now() + Duration::minutes(5))
            .unwrap();

        assert!(matches!(
            other.parse(&token),
            Err(TokenError::InvalidSignature)
        ));
        assert!(!other.is_valid(&token));
    }

    #[test]
    fn test_parse_tampered_token_fails() {
        let codec = TokenCodec::new(SECRET);
        let token = codec
            .mint("sub", Utc::now() + Duration::minutes(5))
            .unwrap();

        let mut tampered = token.clone();
        tampered.truncate(token.len() - 2);

        assert!(codec.parse(&tampered).is_err());
    }

    #[test]
    fn test_expired_token_still_parses() {
        let codec = TokenCodec::new(SECRET);
        let token = codec.mint("sub", Utc::now() - Duration::hours(1)).unwrap();

        // Signature validity is independent of temporal validity
        let claims = codec.parse(&token).unwrap();
        assert_eq!(claims.sub, "sub");
        assert!(claims.expires_at() < Utc::now());
        assert!(codec.is_valid(&token));
    }

    #[test]
    fn test_is_valid_is_idempotent() {
        let codec = TokenCodec::new(SECRET);
        let token = codec
            .mint("sub", Utc::now() + Duration::minutes(5))
            .unwrap();

        assert_eq!(codec.is_valid(&token), codec.is_valid(&token));
        assert_eq!(codec.is_valid("garbage"), codec.is_valid("garbage"));
    }

    #[test]
    fn test_expires_at_accessor() {
        let codec = TokenCodec::new(SECRET);
        let expires_at = Utc::now() + Duration::days(7);
        let token = codec.mint("sub", expires_at).unwrap();

        assert_eq!(
            codec.expires_at(&token).unwrap().timestamp(),
            expires_at.timestamp()
        );
    }

    #[test]
    fn test_ttl_seconds_clamps_to_zero() {
        assert_eq!(ttl_seconds(Utc::now() - Duration::seconds(30)), 0);
        assert_eq!(ttl_seconds(Utc::now() - Duration::days(365)), 0);
    }

    #[test]
    fn test_ttl_seconds_positive() {
        let ttl = ttl_seconds(Utc::now() + Duration::minutes(30));

        // Within one second of the full window
        assert!(ttl > 30 * 60 - 2 && ttl <= 30 * 60);
    }
}
