//! Credential service client configuration.

use url::Url;
use zeroize::Zeroizing;

/// Connection settings for the credential service.
///
/// Custom `Debug` redacts the API token.
#[derive(Clone)]
pub struct ResolverConfig {
    /// Base URL of the credential service.
    pub base_url: Url,
    /// Optional bearer token sent on every request.
    pub api_token: Option<Zeroizing<String>>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ResolverConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CREDENTIALS_API_URL` (required)
    /// - `CREDENTIALS_API_TOKEN` (optional)
    /// - `CREDENTIALS_TIMEOUT_SECS` (default: 10, must be at least 1)
    ///
    /// Returns [`ConfigError::MissingUrl`] only when the URL is unset or
    /// blank. Any other error means a value is present but wrong.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), but an unset URL yields `Ok(None)`
    /// so callers can run without a credential service in development.
    pub fn from_env_if_configured() -> Result<Option<Self>, ConfigError> {
        configured(Self::from_env())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let raw = get("CREDENTIALS_API_URL").ok_or(ConfigError::MissingUrl)?;
        Ok(Self {
            base_url: parse_url("CREDENTIALS_API_URL", raw.trim())?,
            api_token: get("CREDENTIALS_API_TOKEN").map(Zeroizing::new),
            timeout_secs: match get("CREDENTIALS_TIMEOUT_SECS") {
                None => DEFAULT_TIMEOUT_SECS,
                Some(raw) => parse_timeout(&raw)?,
            },
        })
    }

    /// Point at a local mock server (for testing).
    pub fn local(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url("base_url", base_url)?,
            api_token: None,
            timeout_secs: 5,
        })
    }
}

fn configured(loaded: Result<ResolverConfig, ConfigError>) -> Result<Option<ResolverConfig>, ConfigError> {
    match loaded {
        Ok(config) => Ok(Some(config)),
        Err(ConfigError::MissingUrl) => Ok(None),
        Err(e) => Err(e),
    }
}

const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidTimeout(
            raw.to_string(),
            "must be at least 1".to_string(),
        )),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidTimeout(raw.to_string(), e.to_string())),
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(
            var.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(
            var.to_string(),
            "URL cannot be used as a base".to_string(),
        ));
    }
    Ok(url)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CREDENTIALS_API_URL environment variable is required")]
    MissingUrl,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid CREDENTIALS_TIMEOUT_SECS '{0}': {1}")]
    InvalidTimeout(String, String),
    #[error("API token contains characters not allowed in an HTTP header")]
    InvalidToken,
}
