//! HTTP client for the credential service.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET | `/api/v1/owners/{owner}/credentials` | Credentials held by an owner |
//!
//! A 404 means the service has never seen the owner and is reported as an
//! empty credential list.

use std::time::Duration;

use async_trait::async_trait;
use skillchain_core::OwnerId;
use url::Url;

use crate::config::{ConfigError, ResolverConfig};
use crate::error::ResolverError;
use crate::types::CredentialRecord;
use crate::CredentialResolver;

/// Credential resolver backed by the credential service REST API.
#[derive(Debug, Clone)]
pub struct HttpCredentialResolver {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpCredentialResolver {
    /// Build a client from configuration.
    pub fn new(config: ResolverConfig) -> Result<Self, ResolverError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|_| ResolverError::Config(ConfigError::InvalidToken))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ResolverError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    /// Absolute URL of an owner's credential collection. The owner is
    /// percent-encoded as a single path segment.
    fn credentials_url(&self, owner: &OwnerId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v1", "owners", owner.as_str(), "credentials"]);
        }
        url
    }
}

#[async_trait]
impl CredentialResolver for HttpCredentialResolver {
    async fn get_credentials(&self, owner: &OwnerId) -> Result<Vec<CredentialRecord>, ResolverError> {
        let endpoint = "GET /owners/{owner}/credentials";
        let url = self.credentials_url(owner);

        let resp = crate::retry::retry_send(|| self.http.get(url.clone()).send())
            .await
            .map_err(|e| ResolverError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ResolverError::ApiError {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        let records: Vec<CredentialRecord> =
            resp.json().await.map_err(|e| ResolverError::Deserialization {
                endpoint: endpoint.into(),
                source: e,
            })?;

        tracing::debug!(owner = %owner, count = records.len(), "resolved owner credentials");
        Ok(records)
    }

    fn resolver_name(&self) -> &str {
        "HttpCredentialResolver"
    }
}
