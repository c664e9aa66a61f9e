/// Authentication endpoints
///
/// Thin adapters from HTTP to the auth engine. Field-shape validation
/// (email format, presence) happens here with `validator`; the business
/// rules (length minimums, uniqueness, credential checks) live in the
/// engine and surface through its error taxonomy.
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a new local user
/// - `POST /v1/auth/login` - Email/password login
/// - `POST /v1/auth/social/google` - Google authorization-code exchange
/// - `GET  /v1/auth/social/google/authorize` - Browser-facing login URL
/// - `POST /v1/auth/session` - Access-token renewal (session bearer)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, Extension, Json};
use keygate_shared::auth::engine::{IssuedTokens, SessionContext};
use keygate_shared::auth::federated;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username, unique and case-sensitive
    pub username: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (length rules enforced by the engine)
    pub password: String,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// New user ID
    pub user_id: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Google authorization-code exchange request
#[derive(Debug, Deserialize, Validate)]
pub struct SocialLoginRequest {
    /// The authorization code returned by the provider redirect
    #[validate(length(min = 1, message = "Authorization code must not be empty"))]
    pub code: String,
}

/// Token payload returned by login, federated login, and renewal
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthTokenResponse {
    /// Short-lived access token (30 minutes)
    pub access_token: String,

    /// Long-lived session token (7 days, capped at 5 per user)
    pub session_token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// Seconds until the access token expires
    pub access_expires_in: i64,
}

impl From<IssuedTokens> for AuthTokenResponse {
    fn from(tokens: IssuedTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            session_token: tokens.session_token,
            token_type: tokens.token_type,
            access_expires_in: tokens.access_expires_in,
        }
    }
}

/// Browser-facing authorization URL response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizeUrlResponse {
    /// Where to send the user's browser to start the provider login
    pub authorization_url: String,
}

/// Maps `validator` failures onto the 422 response shape
fn validation_error(e: validator::ValidationErrors) -> ApiError {
    let errors: Vec<ValidationErrorDetail> = e
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();

    ApiError::ValidationError(errors)
}

/// Register a new local user
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "username": "validuser",
///   "email": "user@example.com",
///   "password": "at-least-12-chars-pw"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Username or password too short
/// - `409 Conflict`: Email or username already taken
/// - `422 Unprocessable Entity`: Malformed email
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    req.validate().map_err(validation_error)?;

    let user_id = state
        .engine
        .register(&req.username, &req.email, &req.password)
        .await?;

    Ok(Json(RegisterResponse {
        user_id: user_id.to_string(),
    }))
}

/// Login with email and password
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "at-least-12-chars-pw"
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthTokenResponse>> {
    req.validate().map_err(validation_error)?;

    let tokens = state.engine.login(&req.email, &req.password).await?;

    Ok(Json(tokens.into()))
}

/// Exchange a Google authorization code for Keygate tokens
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/social/google
/// Content-Type: application/json
///
/// { "code": "4/0AX4XfW…" }
/// ```
///
/// # Errors
///
/// - `502 Bad Gateway`: Provider exchange failed or provider unconfigured
pub async fn google_login(
    State(state): State<AppState>,
    Json(req): Json<SocialLoginRequest>,
) -> ApiResult<Json<AuthTokenResponse>> {
    req.validate().map_err(validation_error)?;

    let tokens = state.engine.federated_login(&req.code).await?;

    Ok(Json(tokens.into()))
}

/// Hand the client the browser-facing provider login URL
///
/// # Endpoint
///
/// ```text
/// GET /v1/auth/social/google/authorize
/// ```
///
/// # Errors
///
/// - `502 Bad Gateway`: Provider unconfigured (federated login disabled)
pub async fn google_authorize(
    State(state): State<AppState>,
) -> ApiResult<Json<AuthorizeUrlResponse>> {
    match &state.config.google {
        Some(google) => Ok(Json(AuthorizeUrlResponse {
            authorization_url: federated::authorization_url(google),
        })),
        None => Err(ApiError::UpstreamAuthFailure(
            "Federated login is not configured".to_string(),
        )),
    }
}

/// Renew the access token against a live session
///
/// The bearer middleware has already verified the token signature and put
/// a [`SessionContext`] into the request; the engine checks liveness
/// against the session store.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/session
/// Authorization: Bearer <session_token>
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or unsigned bearer (from the middleware)
/// - `403 Forbidden`: Session evicted or revoked
/// - `404 Not Found`: Owning user no longer exists
pub async fn renew(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> ApiResult<Json<AuthTokenResponse>> {
    let tokens = state.engine.renew(&ctx).await?;

    Ok(Json(tokens.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{build_router, AppState};
    use crate::config::{ApiConfig, Config, JwtConfig};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use keygate_shared::auth::engine::AuthEngine;
    use keygate_shared::auth::token::TokenCodec;
    use keygate_shared::db::pool::DatabaseConfig;
    use keygate_shared::store::memory::{InMemorySessionStore, InMemoryUserDirectory};
    use keygate_shared::store::SessionStore;
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    struct TestApp {
        router: Router,
        sessions: Arc<InMemorySessionStore>,
    }

    fn test_app(google: Option<federated::GoogleConfig>) -> TestApp {
        let users = Arc::new(InMemoryUserDirectory::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let codec = TokenCodec::new(SECRET);

        let engine = AuthEngine::new(users, sessions.clone(), codec.clone());

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig::default(),
            jwt: JwtConfig {
                secret: SECRET.to_string(),
            },
            google,
        };

        TestApp {
            router: build_router(AppState::new(Arc::new(engine), codec, config)),
            sessions,
        }
    }

    async fn post_json(
        router: &Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        send(router, request).await
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        (status, body)
    }

    fn register_body() -> serde_json::Value {
        serde_json::json!({
            "username": "validuser",
            "email": "a@example.com",
            "password": "at-least-12-chars-pw"
        })
    }

    fn login_body() -> serde_json::Value {
        serde_json::json!({
            "email": "a@example.com",
            "password": "at-least-12-chars-pw"
        })
    }

    #[tokio::test]
    async fn test_register_returns_user_id() {
        let app = test_app(None);

        let (status, body) = post_json(&app.router, "/v1/auth/register", register_body()).await;

        assert_eq!(status, StatusCode::OK);
        let user_id = body["user_id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(user_id).is_ok());
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_conflict() {
        let app = test_app(None);

        post_json(&app.router, "/v1/auth/register", register_body()).await;
        let (status, body) = post_json(&app.router, "/v1/auth/register", register_body()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");
    }

    #[tokio::test]
    async fn test_register_short_username_is_bad_request() {
        let app = test_app(None);

        let (status, _) = post_json(
            &app.router,
            "/v1/auth/register",
            serde_json::json!({
                "username": "user5",
                "email": "a@example.com",
                "password": "at-least-12-chars-pw"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_malformed_email_is_unprocessable() {
        let app = test_app(None);

        let (status, _) = post_json(
            &app.router,
            "/v1/auth/register",
            serde_json::json!({
                "username": "validuser",
                "email": "not-an-email",
                "password": "at-least-12-chars-pw"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_login_issues_bearer_tokens() {
        let app = test_app(None);
        post_json(&app.router, "/v1/auth/register", register_body()).await;

        let (status, body) = post_json(&app.router, "/v1/auth/login", login_body()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
        assert!(body["access_token"].as_str().unwrap().contains('.'));
        assert!(body["session_token"].as_str().is_some());
        assert!(body["access_expires_in"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_not_found() {
        let app = test_app(None);
        post_json(&app.router, "/v1/auth/register", register_body()).await;

        let (status, body) = post_json(
            &app.router,
            "/v1/auth/login",
            serde_json::json!({
                "email": "a@example.com",
                "password": "wrong-password-here"
            }),
        )
        .await;

        // Indistinguishable from an unknown email
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_renew_without_bearer_is_unauthorized() {
        let app = test_app(None);

        let request = Request::builder()
            .method("POST")
            .uri("/v1/auth/session")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_renew_with_garbage_bearer_is_unauthorized() {
        let app = test_app(None);

        let request = Request::builder()
            .method("POST")
            .uri("/v1/auth/session")
            .header(header::AUTHORIZATION, "Bearer not-a-signed-token")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_renew_returns_fresh_access_token() {
        let app = test_app(None);
        post_json(&app.router, "/v1/auth/register", register_body()).await;
        let (_, login) = post_json(&app.router, "/v1/auth/login", login_body()).await;
        let session_token = login["session_token"].as_str().unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/v1/auth/session")
            .header(header::AUTHORIZATION, format!("Bearer {}", session_token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::OK);
        // Same session token; a new access token
        assert_eq!(body["session_token"], login["session_token"]);
        assert_ne!(body["access_token"], login["access_token"]);
        assert_eq!(body["token_type"], "Bearer");
    }

    #[tokio::test]
    async fn test_renew_evicted_session_is_forbidden() {
        let app = test_app(None);
        post_json(&app.router, "/v1/auth/register", register_body()).await;
        let (_, login) = post_json(&app.router, "/v1/auth/login", login_body()).await;
        let session_token = login["session_token"].as_str().unwrap();

        // Revoked out-of-band: still validly signed, no longer live
        app.sessions.delete(session_token).await.unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/v1/auth/session")
            .header(header::AUTHORIZATION, format!("Bearer {}", session_token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }

    #[tokio::test]
    async fn test_google_login_unconfigured_fails_closed() {
        let app = test_app(None);

        let (status, body) = post_json(
            &app.router,
            "/v1/auth/social/google",
            serde_json::json!({ "code": "some-code" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "upstream_auth_failure");
    }

    #[tokio::test]
    async fn test_google_authorize_unconfigured_fails_closed() {
        let app = test_app(None);

        let request = Request::builder()
            .method("GET")
            .uri("/v1/auth/social/google/authorize")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_google_authorize_returns_login_url() {
        let app = test_app(Some(federated::GoogleConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "https://app.example.com/callback".to_string(),
        }));

        let request = Request::builder()
            .method("GET")
            .uri("/v1/auth/social/google/authorize")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::OK);
        let url = body["authorization_url"].as_str().unwrap();
        assert!(url.starts_with("https://accounts.google.com/"));
        assert!(url.contains("client_id=client-123"));
    }
}
