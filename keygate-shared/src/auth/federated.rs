/// Federated identity exchange (Google-style authorization code flow)
///
/// The core consumes exactly two provider operations: turn an
/// authorization code into a provider access token, and turn that token
/// into a profile (`federated_id`, `email`). Transport details stay behind
/// the [`IdentityExchange`] trait; the engine only sees
/// `UpstreamAuthFailure` when anything on the provider side goes wrong.
///
/// # Example
///
/// ```no_run
/// use keygate_shared::auth::federated::{GoogleConfig, GoogleIdentityExchange, IdentityExchange};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let exchange = GoogleIdentityExchange::new(GoogleConfig {
///     client_id: "client-id".to_string(),
///     client_secret: "client-secret".to_string(),
///     redirect_uri: "https://app.example.com/oauth/callback".to_string(),
/// });
///
/// let provider_token = exchange.exchange_code("auth-code").await?;
/// let profile = exchange.fetch_profile(&provider_token).await?;
/// println!("federated id: {}", profile.federated_id);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::Deserialize;

use super::error::AuthError;

/// Google OAuth2 authorization endpoint (browser-facing)
const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint (code exchange)
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Google userinfo endpoint (profile fetch)
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Provider client identifiers, environment-provided
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth2 client id
    pub client_id: String,

    /// OAuth2 client secret
    pub client_secret: String,

    /// Redirect URI registered with the provider
    pub redirect_uri: String,
}

/// The profile the core needs from a provider
#[derive(Debug, Clone)]
pub struct FederatedProfile {
    /// Provider subject id, unique per account at the provider
    pub federated_id: String,

    /// Email the provider asserts for the account
    pub email: String,
}

/// External collaborator contract for an identity provider
#[async_trait]
pub trait IdentityExchange: Send + Sync {
    /// Exchanges an authorization code for a provider access token
    async fn exchange_code(&self, code: &str) -> Result<String, AuthError>;

    /// Fetches the profile behind a provider access token
    async fn fetch_profile(
        &self,
        provider_access_token: &str,
    ) -> Result<FederatedProfile, AuthError>;
}

/// Token endpoint response payload
#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

/// Userinfo endpoint response payload
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: String,
}

/// Google implementation of the exchange over HTTPS
pub struct GoogleIdentityExchange {
    http: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleIdentityExchange {
    /// Creates an exchange for the given client identifiers
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl IdentityExchange for GoogleIdentityExchange {
    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::UpstreamAuthFailure(format!("token exchange: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "provider token exchange rejected");
            return Err(AuthError::UpstreamAuthFailure(format!(
                "token exchange returned {}: {}",
                status, body
            )));
        }

        let payload: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| AuthError::UpstreamAuthFailure(format!("token exchange body: {}", e)))?;

        Ok(payload.access_token)
    }

    async fn fetch_profile(
        &self,
        provider_access_token: &str,
    ) -> Result<FederatedProfile, AuthError> {
        let response = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(provider_access_token)
            .send()
            .await
            .map_err(|e| AuthError::UpstreamAuthFailure(format!("profile fetch: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "provider profile fetch rejected");
            return Err(AuthError::UpstreamAuthFailure(format!(
                "profile fetch returned {}: {}",
                status, body
            )));
        }

        let info: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| AuthError::UpstreamAuthFailure(format!("profile body: {}", e)))?;

        Ok(FederatedProfile {
            federated_id: info.id,
            email: info.email,
        })
    }
}

/// Builds the browser-facing authorization URL for a login redirect
///
/// `access_type=offline` and `prompt=consent` ask the provider for a
/// refreshable grant on every pass, matching the registered redirect URI.
pub fn authorization_url(config: &GoogleConfig) -> String {
    let url = reqwest::Url::parse_with_params(
        AUTH_ENDPOINT,
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .expect("authorization endpoint is a valid base URL");

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GoogleConfig {
        GoogleConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret-456".to_string(),
            redirect_uri: "https://app.example.com/callback".to_string(),
        }
    }

    #[test]
    fn test_authorization_url_carries_query_params() {
        let url = authorization_url(&config());

        assert!(url.starts_with(AUTH_ENDPOINT));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid+email+profile"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        // The secret never appears in the browser-facing URL
        assert!(!url.contains("secret-456"));
    }

    #[test]
    fn test_token_exchange_response_deserializes() {
        let payload: TokenExchangeResponse = serde_json::from_str(
            r#"{"access_token": "ya29.abc", "expires_in": 3599, "token_type": "Bearer"}"#,
        )
        .unwrap();

        assert_eq!(payload.access_token, "ya29.abc");
    }

    #[test]
    fn test_userinfo_response_deserializes() {
        let info: GoogleUserInfo = serde_json::from_str(
            r#"{"id": "1093845", "email": "user@example.com", "verified_email": true, "picture": "https://…"}"#,
        )
        .unwrap();

        assert_eq!(info.id, "1093845");
        assert_eq!(info.email, "user@example.com");
    }
}
