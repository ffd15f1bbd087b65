//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Share lifecycle counters are bumped by the route handlers.
//! Everything is exposed in text format at `/metrics`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use skillchain_core::identity::SHARE_ID_PREFIX;

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    shares_created_total: IntCounter,
    share_verifications_total: IntCounterVec,
    shares_revoked_total: IntCounter,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("skillchain_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "skillchain_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("skillchain_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let shares_created_total =
            IntCounter::new("skillchain_shares_created_total", "Shares issued")
                .expect("metric can be created");

        let share_verifications_total = IntCounterVec::new(
            Opts::new(
                "skillchain_share_verifications_total",
                "Share verification attempts by outcome",
            ),
            &["outcome"],
        )
        .expect("metric can be created");

        let shares_revoked_total =
            IntCounter::new("skillchain_shares_revoked_total", "Shares revoked by their owner")
                .expect("metric can be created");

        let collectors: [Box<dyn Collector>; 6] = [
            Box::new(http_requests_total.clone()),
            Box::new(http_request_duration_seconds.clone()),
            Box::new(http_errors_total.clone()),
            Box::new(shares_created_total.clone()),
            Box::new(share_verifications_total.clone()),
            Box::new(shares_revoked_total.clone()),
        ];
        for collector in collectors {
            registry
                .register(collector)
                .expect("metric can be registered");
        }

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                shares_created_total,
                share_verifications_total,
                shares_revoked_total,
            }),
        }
    }

    /// Total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total error count (sum across all labels).
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    pub fn record_share_created(&self) {
        self.inner.shares_created_total.inc();
    }

    /// `outcome` is `"granted"` or a lowercased error code.
    pub fn record_verification(&self, outcome: &str) {
        self.inner
            .share_verifications_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn record_revocation(&self) {
        self.inner.shares_revoked_total.inc();
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Whether HTTP metrics middleware is mounted. Disabled with
/// `SKILLCHAIN_METRICS=off`.
pub fn metrics_enabled() -> bool {
    !matches!(
        std::env::var("SKILLCHAIN_METRICS").as_deref(),
        Ok("off") | Ok("false") | Ok("0")
    )
}

/// Replace share identifiers in a path with `{share_id}` so label
/// cardinality stays bounded.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with(SHARE_ID_PREFIX) {
                "{share_id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_counted_separately() {
        let m = ApiMetrics::new();
        for _ in 0..3 {
            m.record_request("GET", "/v1/shares", 200, 0.01);
        }
        m.record_request("POST", "/v1/shares/{share_id}/verify", 410, 0.02);
        assert_eq!(m.requests(), 4);
        assert_eq!(m.errors(), 1);
    }

    #[test]
    fn normalize_replaces_share_ids() {
        assert_eq!(
            normalize_path("/v1/shares/share_loyw3v28_abc/verify"),
            "/v1/shares/{share_id}/verify"
        );
        assert_eq!(normalize_path("/v1/shares/stats"), "/v1/shares/stats");
    }

    #[test]
    fn encode_includes_domain_counters() {
        let m = ApiMetrics::new();
        m.record_share_created();
        m.record_verification("granted");
        m.record_verification("access_limit_reached");
        m.record_revocation();

        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("skillchain_shares_created_total 1"));
        assert!(text.contains("skillchain_share_verifications_total{outcome=\"granted\"} 1"));
        assert!(text.contains("skillchain_shares_revoked_total 1"));
    }

    #[test]
    fn concurrent_increments_are_safe() {
        let m = ApiMetrics::new();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let m = m.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        m.record_request("GET", "/v1/shares", 200, 0.001);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(m.requests(), 4000);
    }
}
