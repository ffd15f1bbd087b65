//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.

use std::sync::Arc;

use skillchain_core::{Clock, SystemClock};
use skillchain_resolver::{CredentialResolver, StaticCredentialResolver};
use sqlx::PgPool;
use thiserror::Error;
use url::Url;

use crate::lifecycle::ShareLifecycle;
use crate::links::{LinkBuilder, DEFAULT_QR_SERVICE_URL, DEFAULT_QR_SIZE};
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::RateLimitConfig;
use crate::store::{MemoryShareStore, ShareStore};

/// Default origin of the web client that serves `/verify/{id}` pages.
pub const DEFAULT_PUBLIC_ORIGIN: &str = "http://localhost:5173";

/// Application configuration.
///
/// Custom `Debug` redacts the auth token.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared secret expected after the wallet in bearer tokens.
    /// If `None`, any bearer wallet is trusted (development).
    pub auth_token: Option<String>,
    /// Origin that verification links point at.
    pub public_origin: String,
    /// QR image service endpoint.
    pub qr_service_url: String,
    /// QR image edge length in pixels.
    pub qr_size: u32,
    pub rate_limit: RateLimitConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("public_origin", &self.public_origin)
            .field("qr_service_url", &self.qr_service_url)
            .field("qr_size", &self.qr_size)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            public_origin: DEFAULT_PUBLIC_ORIGIN.to_string(),
            qr_service_url: DEFAULT_QR_SERVICE_URL.to_string(),
            qr_size: DEFAULT_QR_SIZE,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `PORT` | `8080` |
    /// | `AUTH_TOKEN` | unset (development mode) |
    /// | `PUBLIC_ORIGIN` | `http://localhost:5173` |
    /// | `QR_SERVICE_URL` | `https://api.qrserver.com/v1/create-qr-code/` |
    /// | `QR_SIZE` | `400` |
    /// | `RATE_LIMIT_MAX_REQUESTS` | `1000` |
    /// | `RATE_LIMIT_WINDOW_SECS` | `60` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        Ok(Self {
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            auth_token: get("AUTH_TOKEN"),
            public_origin: base_url("PUBLIC_ORIGIN", get("PUBLIC_ORIGIN"), defaults.public_origin)?,
            qr_service_url: base_url(
                "QR_SERVICE_URL",
                get("QR_SERVICE_URL"),
                defaults.qr_service_url,
            )?,
            qr_size: match parse_or("QR_SIZE", get("QR_SIZE"), defaults.qr_size)? {
                0 => {
                    return Err(ConfigError::Invalid {
                        var: "QR_SIZE",
                        reason: "must be at least 1".into(),
                    })
                }
                n => n,
            },
            rate_limit: RateLimitConfig {
                max_requests: parse_or(
                    "RATE_LIMIT_MAX_REQUESTS",
                    get("RATE_LIMIT_MAX_REQUESTS"),
                    defaults.rate_limit.max_requests,
                )?,
                window_secs: parse_or(
                    "RATE_LIMIT_WINDOW_SECS",
                    get("RATE_LIMIT_WINDOW_SECS"),
                    defaults.rate_limit.window_secs,
                )?,
            },
        })
    }

    pub fn links(&self) -> LinkBuilder {
        LinkBuilder::new(&self.public_origin, &self.qr_service_url, self.qr_size)
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}

fn base_url(var: &'static str, raw: Option<String>, default: String) -> Result<String, ConfigError> {
    let raw = raw.unwrap_or(default);
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(raw.trim().to_string())
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub lifecycle: Arc<ShareLifecycle>,
    pub metrics: ApiMetrics,
    pub config: AppConfig,
    /// Present when shares are stored in Postgres; checked by readiness.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// In-memory store, empty static resolver, system clock, default config.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::from_parts(
            config,
            Arc::new(MemoryShareStore::new()),
            Arc::new(StaticCredentialResolver::new()),
            Arc::new(SystemClock),
            None,
        )
    }

    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn ShareStore>,
        resolver: Arc<dyn CredentialResolver>,
        clock: Arc<dyn Clock>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let lifecycle = ShareLifecycle::new(store, resolver, clock, config.links());
        Self {
            lifecycle: Arc::new(lifecycle),
            metrics: ApiMetrics::new(),
            config,
            db_pool,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
