//! # Keygate API Server
//!
//! Identity and credential service: local password accounts, Google
//! federated accounts, short-lived access tokens, and renewable session
//! tokens with a per-user concurrency cap.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p keygate-api
//! ```

use std::sync::Arc;

use keygate_api::app::{build_router, AppState};
use keygate_api::config::Config;
use keygate_shared::auth::engine::AuthEngine;
use keygate_shared::auth::federated::GoogleIdentityExchange;
use keygate_shared::auth::token::TokenCodec;
use keygate_shared::db::{migrations, pool};
use keygate_shared::store::sessions::PgSessionStore;
use keygate_shared::store::users::PgUserDirectory;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate_api=info,keygate_shared=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Keygate API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    // Configuration failures are fatal here, never per-request
    let config = Config::from_env()?;

    let db = pool::create_pool(config.database.clone()).await?;
    migrations::run_migrations(&db).await?;

    let codec = TokenCodec::new(&config.jwt.secret);

    let mut engine = AuthEngine::new(
        Arc::new(PgUserDirectory::new(db.clone())),
        Arc::new(PgSessionStore::new(db)),
        codec.clone(),
    );

    if let Some(google) = config.google.clone() {
        engine = engine.with_identity_exchange(Arc::new(GoogleIdentityExchange::new(google)));
        tracing::info!("federated login enabled");
    }

    let bind_address = config.bind_address();
    let state = AppState::new(Arc::new(engine), codec, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves when the process receives Ctrl-C
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl-C handler");
    tracing::info!("Shutdown signal received");
}
