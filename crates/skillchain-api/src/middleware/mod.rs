//! Request middleware: Prometheus metrics, rate limiting and trace spans.

pub mod metrics;
pub mod rate_limit;
pub mod tracing_layer;
