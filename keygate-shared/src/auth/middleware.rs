/// Bearer authentication middleware for session-token renewal
///
/// Extracts `Authorization: Bearer <token>`, verifies the SIGNATURE with
/// the process-wide codec, and inserts a [`SessionContext`] into the
/// request extensions for the handler. Temporal validity and store
/// liveness are the engine's concern — this layer only establishes that
/// the client presented a token we signed.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::post, Extension, Router};
/// use keygate_shared::auth::engine::SessionContext;
/// use keygate_shared::auth::middleware::create_session_middleware;
/// use keygate_shared::auth::token::TokenCodec;
///
/// async fn renew(Extension(ctx): Extension<SessionContext>) -> String {
///     format!("renewing session for {}", ctx.claims.sub)
/// }
///
/// let codec = TokenCodec::new("secret-key-at-least-32-bytes-long!!");
/// let app: Router = Router::new()
///     .route("/v1/auth/session", post(renew))
///     .layer(middleware::from_fn(create_session_middleware(codec)));
/// ```

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::engine::SessionContext;
use super::token::TokenCodec;

/// Error type for the bearer authentication layer
#[derive(Debug)]
pub enum BearerError {
    /// Missing Authorization header
    MissingCredentials,

    /// Authorization header is not a Bearer credential
    InvalidFormat(String),

    /// Signature verification failed
    InvalidToken,
}

impl IntoResponse for BearerError {
    fn into_response(self) -> Response {
        match self {
            BearerError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
            }
            BearerError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            BearerError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "Invalid token").into_response()
            }
        }
    }
}

/// Pulls the bearer token out of the request headers
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, BearerError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(BearerError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| BearerError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Session bearer middleware
///
/// On success the request gains a [`SessionContext`] extension carrying
/// the raw token and its verified claims.
pub async fn session_auth_middleware(
    codec: TokenCodec,
    mut req: Request,
    next: Next,
) -> Result<Response, BearerError> {
    let token = extract_bearer(req.headers())?.to_string();

    let claims = codec.parse(&token).map_err(|_| BearerError::InvalidToken)?;

    req.extensions_mut()
        .insert(SessionContext { token, claims });

    Ok(next.run(req).await)
}

/// Creates a session bearer middleware closure
///
/// Helper that captures the token codec and returns a middleware function
/// suitable for `axum::middleware::from_fn`.
pub fn create_session_middleware(
    codec: TokenCodec,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, BearerError>> + Send>,
> + Clone {
    move |req, next| {
        let codec = codec.clone();
        Box::pin(session_auth_middleware(codec, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer some-token"),
        );

        assert_eq!(extract_bearer(&headers).unwrap(), "some-token");
    }

    #[test]
    fn test_extract_bearer_missing_header() {
        let headers = HeaderMap::new();

        assert!(matches!(
            extract_bearer(&headers),
            Err(BearerError::MissingCredentials)
        ));
    }

    #[test]
    fn test_extract_bearer_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );

        assert!(matches!(
            extract_bearer(&headers),
            Err(BearerError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_bearer_error_into_response() {
        let response = BearerError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = BearerError::InvalidFormat("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = BearerError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
