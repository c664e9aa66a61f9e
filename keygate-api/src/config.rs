/// Configuration management for the API server
///
/// Loads configuration from environment variables into a typed struct,
/// once at startup. Required values that are missing abort the process;
/// nothing in this service reads the environment after boot.
///
/// # Environment Variables
///
/// - `KEYGATE_JWT_SECRET`: Secret key for token signing (required, ≥ 32 chars)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `KEYGATE_HOST`: Host to bind to (default: 0.0.0.0)
/// - `KEYGATE_PORT`: Port to bind to (default: 8080)
/// - `KEYGATE_CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `KEYGATE_GOOGLE_CLIENT_ID` / `KEYGATE_GOOGLE_CLIENT_SECRET` /
///   `KEYGATE_GOOGLE_REDIRECT_URI`: federated login credentials; all three
///   must be present for federated flows to be enabled, otherwise the
///   federated endpoints fail closed and the rest of the service runs
/// - `RUST_LOG`: Log filter (default: info)
///
/// # Example
///
/// ```no_run
/// use keygate_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use keygate_shared::auth::federated::GoogleConfig;
use keygate_shared::db::pool::DatabaseConfig;
use std::env;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Token signing configuration
    pub jwt: JwtConfig,

    /// Federated identity provider credentials, if configured
    pub google: Option<GoogleConfig>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; "*" means permissive
    pub cors_origins: Vec<String>,
}

/// Token signing configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HS256 signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or malformed;
    /// startup is the only place configuration failures may surface.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("KEYGATE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("KEYGATE_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins = env::var("KEYGATE_CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("KEYGATE_JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("KEYGATE_JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("KEYGATE_JWT_SECRET must be at least 32 characters long");
        }

        let google = google_config(
            env::var("KEYGATE_GOOGLE_CLIENT_ID").ok(),
            env::var("KEYGATE_GOOGLE_CLIENT_SECRET").ok(),
            env::var("KEYGATE_GOOGLE_REDIRECT_URI").ok(),
        );

        if google.is_none() {
            tracing::warn!("Google credentials not fully configured; federated login disabled");
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                ..Default::default()
            },
            jwt: JwtConfig { secret: jwt_secret },
            google,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Assembles the provider credentials; any missing part disables the flow
fn google_config(
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
) -> Option<GoogleConfig> {
    match (client_id, client_secret, redirect_uri) {
        (Some(client_id), Some(client_secret), Some(redirect_uri)) => Some(GoogleConfig {
            client_id,
            client_secret,
            redirect_uri,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config(google: Option<GoogleConfig>) -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                ..Default::default()
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            google,
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(sample_config(None).bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_google_config_requires_all_three() {
        assert!(google_config(
            Some("id".to_string()),
            Some("secret".to_string()),
            Some("https://cb".to_string())
        )
        .is_some());

        assert!(google_config(None, None, None).is_none());
        assert!(google_config(
            Some("id".to_string()),
            None,
            Some("https://cb".to_string())
        )
        .is_none());
        assert!(google_config(Some("id".to_string()), Some("secret".to_string()), None).is_none());
    }
}
