//! # skillchain-api: Credential Sharing Service
//!
//! Lets a credential owner hand a third party a link that reveals a chosen
//! subset of their verified credentials, bounded by an optional expiry
//! date and an optional access limit, and revocable at any time.
//!
//! ## API Surface
//!
//! | Route | Module | Auth |
//! |-------|--------|------|
//! | `POST /v1/shares`, `GET /v1/shares` | [`routes::shares`] | owner |
//! | `GET /v1/shares/stats` | [`routes::shares`] | owner |
//! | `POST /v1/shares/:share_id/revoke` | [`routes::shares`] | owner |
//! | `POST /v1/shares/:share_id/verify` | [`routes::verification`] | none |
//! | `/health/*`, `/metrics` | this module | none |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! The verification route skips `AuthMiddleware`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod lifecycle;
pub mod links;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod store;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::auth::AuthConfig;
use crate::error::AppError;
use crate::middleware::metrics::{metrics_enabled, metrics_middleware};
use crate::middleware::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` are mounted outside every middleware so
/// they stay reachable when the rate limiter is saturated.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig::new(state.config.auth_token.clone());
    let limiter = RateLimiter::new(state.config.rate_limit.clone());

    // Owner-scoped routes.
    let owner_routes = Router::new()
        .merge(routes::shares::router())
        .merge(openapi::router())
        .layer(from_fn(rate_limit_middleware))
        .layer(from_fn(auth::auth_middleware));

    // Public verification.
    let public_routes = routes::verification::router().layer(from_fn(rate_limit_middleware));

    let mut api = Router::new()
        .merge(owner_routes)
        .merge(public_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));
    if metrics_enabled() {
        api = api
            .layer(from_fn(metrics_middleware))
            .layer(axum::Extension(state.metrics.clone()));
    }
    let api = api
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(limiter))
        .with_state(state.clone());

    let probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics))
        .with_state(state);

    Router::new().merge(probes).merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the share store can serve requests.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::ping(pool).await {
            tracing::warn!(error = %e, "readiness check failed: database unreachable");
            return AppError::ServiceUnavailable("database unreachable".into()).into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}

/// Prometheus text exposition.
async fn metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state.metrics.gather_and_encode().map_err(AppError::Internal)
}
