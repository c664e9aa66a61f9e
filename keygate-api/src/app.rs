/// Application state and router builder
///
/// The state carries a concrete [`AuthEngine`] constructed at startup —
/// explicit dependency injection, no runtime discovery. Handlers never see
/// the stores or the signing secret directly; renewal handlers receive the
/// caller's session claims as an explicit [`SessionContext`] extension put
/// there by the bearer middleware, never from ambient state.
///
/// # Routes
///
/// ```text
/// /
/// ├── /health                              # Liveness (public)
/// └── /v1/auth/
///     ├── POST /register                   # Create a local account
///     ├── POST /login                      # Email/password login
///     ├── POST /social/google              # Authorization-code exchange
///     ├── GET  /social/google/authorize    # Browser-facing login URL
///     └── POST /session                    # Access-token renewal (Bearer)
/// ```
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use keygate_api::{app::{build_router, AppState}, config::Config};
/// use keygate_shared::auth::{engine::AuthEngine, token::TokenCodec};
/// use keygate_shared::store::memory::{InMemorySessionStore, InMemoryUserDirectory};
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let codec = TokenCodec::new(&config.jwt.secret);
/// let engine = AuthEngine::new(
///     Arc::new(InMemoryUserDirectory::new()),
///     Arc::new(InMemorySessionStore::new()),
///     codec.clone(),
/// );
/// let app = build_router(AppState::new(Arc::new(engine), codec, config));
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use keygate_shared::auth::engine::AuthEngine;
use keygate_shared::auth::middleware::create_session_middleware;
use keygate_shared::auth::token::TokenCodec;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; cheap
/// because everything inside is an Arc or an Arc-backed key.
#[derive(Clone)]
pub struct AppState {
    /// The authentication engine
    pub engine: Arc<AuthEngine>,

    /// Token codec, shared with the bearer middleware
    pub codec: TokenCodec,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(engine: Arc<AuthEngine>, codec: TokenCodec, config: Config) -> Self {
        Self {
            engine,
            codec,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/social/google", post(routes::auth::google_login))
        .route("/social/google/authorize", get(routes::auth::google_authorize));

    // Renewal requires a signature-verified session bearer
    let session_routes = Router::new()
        .route("/session", post(routes::auth::renew))
        .layer(axum::middleware::from_fn(create_session_middleware(
            state.codec.clone(),
        )));

    let v1_routes = Router::new().nest("/auth", auth_routes.merge(session_routes));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
