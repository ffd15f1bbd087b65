//! # Caller Authentication
//!
//! Bearer middleware that establishes which owner is calling.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {wallet}:{secret}   when AUTH_TOKEN is configured
//! Bearer {wallet}            when AUTH_TOKEN is unset (development)
//! ```
//!
//! A request without an `Authorization` header is passed through with no
//! identity. Owner-scoped operations then fail with
//! `AUTHENTICATION_REQUIRED`; public verification never looks at identity.
//! A header that is present but wrong is rejected here with 401.

use axum::extract::Request;
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use skillchain_core::OwnerId;
use skillchain_state::ShareError;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::AppError;

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Authenticated owner, injected into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub owner: OwnerId,
}

/// Extracts the identity that the auth middleware injected into extensions.
///
/// Handlers that serve anonymous callers too take `Option<CallerIdentity>`.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or(AppError::Share(ShareError::AuthenticationRequired))
    }
}

/// Unwrap an optional caller into an owner, or fail with
/// `AUTHENTICATION_REQUIRED`.
pub fn require_caller(caller: Option<CallerIdentity>) -> Result<OwnerId, AppError> {
    caller
        .map(|c| c.owner)
        .ok_or(AppError::Share(ShareError::AuthenticationRequired))
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub token: Option<Zeroizing<String>>,
}

impl AuthConfig {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()).map(Zeroizing::new),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of shared secrets.
///
/// When lengths differ, performs a dummy comparison so timing does not
/// reveal the expected length.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer credential into the calling owner.
///
/// With `expected_secret` set the credential must be `{wallet}:{secret}`.
/// Without it only the wallet part is read.
pub fn parse_bearer_token(
    provided: &str,
    expected_secret: Option<&str>,
) -> Result<CallerIdentity, String> {
    let (wallet, secret) = match provided.split_once(':') {
        Some((wallet, secret)) => (wallet, Some(secret)),
        None => (provided, None),
    };

    if let Some(expected) = expected_secret {
        let secret = secret.ok_or("invalid token format, expected {wallet}:{secret}")?;
        if !constant_time_token_eq(secret, expected) {
            return Err("invalid bearer token".into());
        }
    }

    let owner = OwnerId::new(wallet).map_err(|e| format!("invalid wallet identity: {e}"))?;
    Ok(CallerIdentity { owner })
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Resolve the caller from the `Authorization` header and inject
/// [`CallerIdentity`] into request extensions.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().map(str::to_owned));

    match auth_header {
        None => next.run(request).await,
        Some(Ok(value)) => match value.strip_prefix("Bearer ") {
            Some(provided) => {
                match parse_bearer_token(provided.trim(), config.token.as_deref().map(String::as_str)) {
                    Ok(identity) => {
                        request.extensions_mut().insert(identity);
                        next.run(request).await
                    }
                    Err(msg) => {
                        tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                        unauthorized_response(&msg)
                    }
                }
            }
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                unauthorized_response("authorization header must use Bearer scheme")
            }
        },
        Some(Err(_)) => {
            tracing::warn!("authentication failed: non-ASCII authorization header");
            unauthorized_response("authorization header is not valid ASCII")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn whoami(caller: Option<CallerIdentity>) -> String {
        caller
            .map(|c| c.owner.to_string())
            .unwrap_or_else(|| "anonymous".into())
    }

    fn test_app(token: Option<&str>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(AuthConfig::new(token.map(String::from))))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("authorization", value);
        }
        let resp = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn missing_header_is_anonymous() {
        let (status, body) = call(test_app(Some("s3cret")), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn wallet_and_secret_accepted() {
        let (status, body) = call(test_app(Some("s3cret")), Some("Bearer 0xABC:s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "0xabc");
    }

    #[tokio::test]
    async fn wrong_secret_rejected() {
        let (status, body) = call(test_app(Some("s3cret")), Some("Bearer 0xabc:nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("UNAUTHORIZED"));
    }

    #[tokio::test]
    async fn bare_wallet_rejected_when_secret_configured() {
        let (status, _) = call(test_app(Some("s3cret")), Some("Bearer 0xabc")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bare_wallet_accepted_in_development() {
        let (status, body) = call(test_app(None), Some("Bearer 0xOwner")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "0xowner");
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let (status, _) = call(test_app(None), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_wallet_rejected() {
        let (status, _) = call(test_app(Some("s3cret")), Some("Bearer :s3cret")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn constant_time_eq_handles_lengths() {
        assert!(constant_time_token_eq("abc", "abc"));
        assert!(!constant_time_token_eq("abc", "abcd"));
        assert!(!constant_time_token_eq("abd", "abc"));
    }

    #[test]
    fn auth_config_debug_redacts() {
        let out = format!("{:?}", AuthConfig::new(Some("super-secret".into())));
        assert!(!out.contains("super-secret"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn empty_token_disables_secret_check() {
        assert!(AuthConfig::new(Some(String::new())).token.is_none());
    }

    #[test]
    fn require_caller_maps_missing_identity() {
        let err = require_caller(None).unwrap_err();
        assert!(matches!(err, AppError::Share(ShareError::AuthenticationRequired)));
    }
}
