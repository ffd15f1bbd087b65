//! # Per-Client Rate Limiting
//!
//! Fixed-window limiter keyed by the first `X-Forwarded-For` hop. The
//! public verification endpoint is the main target: share identifiers are
//! unguessable, but nothing else stops a client from hammering it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use crate::error::{ErrorBody, ErrorDetail};

/// Rate limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            window_secs: 60,
        }
    }
}

/// Most clients tracked at once. Past this, the oldest windows are evicted.
const MAX_TRACKED_CLIENTS: usize = 10_000;

#[derive(Debug, Clone)]
struct BucketState {
    count: u64,
    window_start: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    max_clients: usize,
    buckets: Arc<Mutex<HashMap<String, BucketState>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_max_clients(config, MAX_TRACKED_CLIENTS)
    }

    fn with_max_clients(config: RateLimitConfig, max_clients: usize) -> Self {
        Self {
            config,
            max_clients: max_clients.max(1),
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Record one request from `key`. Returns `false` when over the limit.
    fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_secs);

        if !buckets.contains_key(key) && buckets.len() >= self.max_clients {
            buckets.retain(|_, b| now.duration_since(b.window_start) < window);
            if buckets.len() >= self.max_clients {
                evict_oldest(&mut buckets, self.max_clients);
            }
        }

        let bucket = buckets.entry(key.to_string()).or_insert(BucketState {
            count: 0,
            window_start: now,
        });

        if now.duration_since(bucket.window_start) >= window {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count >= self.config.max_requests {
            false
        } else {
            bucket.count += 1;
            true
        }
    }
}

/// Drop the oldest windows until roughly a tenth of the capacity is free.
fn evict_oldest(buckets: &mut HashMap<String, BucketState>, max_clients: usize) {
    let keep = max_clients - (max_clients / 10).max(1);
    let mut by_age: Vec<(Instant, String)> = buckets
        .iter()
        .map(|(k, b)| (b.window_start, k.clone()))
        .collect();
    by_age.sort_unstable();
    let excess = buckets.len().saturating_sub(keep);
    for (_, key) in by_age.into_iter().take(excess) {
        buckets.remove(&key);
    }
}

fn client_key(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

/// Middleware that enforces per-client rate limits.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let key = client_key(&request);
        if !limiter.check(&key) {
            tracing::warn!(client = %key, "rate limit exceeded");
            let body = ErrorBody {
                error: ErrorDetail {
                    code: "RATE_LIMITED".to_string(),
                    message: "rate limit exceeded".to_string(),
                    details: None,
                },
            };
            return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn limiter(max_requests: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window_secs: 60,
        })
    }

    #[test]
    fn allows_up_to_limit() {
        let l = limiter(2);
        assert!(l.check("a"));
        assert!(l.check("a"));
        assert!(!l.check("a"));
    }

    #[test]
    fn keys_are_independent() {
        let l = limiter(1);
        assert!(l.check("a"));
        assert!(l.check("b"));
        assert!(!l.check("a"));
    }

    #[test]
    fn zero_window_resets_every_request() {
        let l = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window_secs: 0,
        });
        assert!(l.check("a"));
        assert!(l.check("a"));
    }

    #[test]
    fn rotating_client_keys_stay_bounded_within_one_window() {
        let l = RateLimiter::with_max_clients(RateLimitConfig::default(), 100);
        for n in 0..1_000 {
            assert!(l.check(&format!("198.51.100.{n}")));
            assert!(l.tracked_clients() <= 100);
        }
    }

    #[test]
    fn eviction_drops_oldest_windows_first() {
        let l = RateLimiter::with_max_clients(RateLimitConfig::default(), 10);
        for n in 0..10 {
            assert!(l.check(&format!("k{n}")));
        }
        assert!(l.check("fresh"));

        let buckets = l.buckets.lock();
        assert!(!buckets.contains_key("k0"));
        assert!(buckets.contains_key("k9"));
        assert!(buckets.contains_key("fresh"));
        assert!(buckets.len() <= 10);
    }

    #[test]
    fn client_key_uses_first_forwarded_hop() {
        let req = axum::http::Request::builder()
            .header("x-forwarded-for", " 203.0.113.7 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&req), "203.0.113.7");

        let anon = axum::http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&anon), "anonymous");
    }

    #[tokio::test]
    async fn middleware_returns_429_over_limit() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn(rate_limit_middleware))
            .layer(axum::Extension(limiter(1)));

        let first = app
            .clone()
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
