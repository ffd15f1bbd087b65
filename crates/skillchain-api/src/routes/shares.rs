//! # Share Management API
//!
//! Owner-scoped endpoints. The caller is whoever the bearer token names;
//! every operation only ever sees that caller's shares.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillchain_core::CredentialId;
use skillchain_state::ShareStats;
use std::num::NonZeroU64;
use utoipa::ToSchema;

use crate::auth::{require_caller, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::lifecycle::{CreatedShare, NewShare, RevokedShare, ShareSummary};
use crate::state::AppState;

use super::parse_share_id;

/// Longest accepted description, in characters, after trimming.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Most credentials a single share may bundle.
pub const MAX_CREDENTIALS_PER_SHARE: usize = 100;

/// Request to share a set of credentials.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    /// Credentials to expose. Duplicates are collapsed.
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub credential_ids: Vec<CredentialId>,
    /// Must be in the future. Omit for no expiry.
    pub expiry_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    /// Cap on successful verifications. Omit for unlimited.
    #[schema(minimum = 1)]
    pub max_access_count: Option<u64>,
}

impl Validate for CreateShareRequest {
    fn validate(&self) -> Result<(), String> {
        if self.credential_ids.len() > MAX_CREDENTIALS_PER_SHARE {
            return Err(format!(
                "a share may include at most {MAX_CREDENTIALS_PER_SHARE} credentials"
            ));
        }
        if let Some(description) = &self.description {
            if description.trim().chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(format!(
                    "description must be at most {MAX_DESCRIPTION_CHARS} characters"
                ));
            }
        }
        if self.max_access_count == Some(0) {
            return Err("maxAccessCount must be at least 1".into());
        }
        Ok(())
    }
}

impl From<CreateShareRequest> for NewShare {
    fn from(req: CreateShareRequest) -> Self {
        Self {
            credential_ids: req.credential_ids,
            expiry_date: req.expiry_date,
            description: req.description,
            max_access_count: req.max_access_count.and_then(NonZeroU64::new),
        }
    }
}

/// Dashboard counters for the caller's shares.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareStatsResponse {
    pub total: u64,
    pub active: u64,
    /// Past expiry or at the access limit.
    pub expired: u64,
    pub revoked: u64,
    /// Successful verifications across all shares.
    pub total_access: u64,
}

impl From<ShareStats> for ShareStatsResponse {
    fn from(stats: ShareStats) -> Self {
        Self {
            total: stats.total,
            active: stats.active,
            expired: stats.expired,
            revoked: stats.revoked,
            total_access: stats.total_access,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/shares", post(create_share).get(list_shares))
        .route("/v1/shares/stats", get(share_stats))
        .route("/v1/shares/:share_id/revoke", post(revoke_share))
}

/// POST /v1/shares: Share credentials.
#[utoipa::path(
    post,
    path = "/v1/shares",
    request_body = CreateShareRequest,
    responses(
        (status = 201, description = "Share created", body = CreatedShare),
        (status = 401, description = "No caller identity", body = crate::error::ErrorBody),
        (status = 403, description = "Caller does not own every selected credential", body = crate::error::ErrorBody),
        (status = 422, description = "Empty selection, past expiry or invalid field", body = crate::error::ErrorBody),
        (status = 503, description = "Credential service unavailable", body = crate::error::ErrorBody),
    ),
    tag = "shares"
)]
pub async fn create_share(
    State(state): State<AppState>,
    caller: Option<CallerIdentity>,
    body: Result<Json<CreateShareRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedShare>), AppError> {
    let owner = require_caller(caller)?;
    let req = extract_validated_json(body)?;

    let owned = if req.credential_ids.is_empty() {
        Vec::new()
    } else {
        state
            .lifecycle
            .owned_credentials(&owner)
            .await
            .map_err(|e| {
                tracing::error!(owner = %owner, error = %e, "credential lookup failed");
                AppError::ServiceUnavailable("credential service unavailable".into())
            })?
    };

    let created = state
        .lifecycle
        .create(Some(&owner), &owned, req.into())
        .await?;
    state.metrics.record_share_created();

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /v1/shares: List the caller's shares, newest first.
#[utoipa::path(
    get,
    path = "/v1/shares",
    responses(
        (status = 200, description = "Caller's shares", body = Vec<ShareSummary>),
        (status = 401, description = "No caller identity", body = crate::error::ErrorBody),
    ),
    tag = "shares"
)]
pub async fn list_shares(
    State(state): State<AppState>,
    caller: Option<CallerIdentity>,
) -> Result<Json<Vec<ShareSummary>>, AppError> {
    let owner = caller.map(|c| c.owner);
    let shares = state.lifecycle.list_shares(owner.as_ref()).await?;
    Ok(Json(shares))
}

/// GET /v1/shares/stats: Aggregate counters over the caller's shares.
#[utoipa::path(
    get,
    path = "/v1/shares/stats",
    responses(
        (status = 200, description = "Share statistics", body = ShareStatsResponse),
        (status = 401, description = "No caller identity", body = crate::error::ErrorBody),
    ),
    tag = "shares"
)]
pub async fn share_stats(
    State(state): State<AppState>,
    caller: Option<CallerIdentity>,
) -> Result<Json<ShareStatsResponse>, AppError> {
    let owner = caller.map(|c| c.owner);
    let stats = state.lifecycle.stats(owner.as_ref()).await?;
    Ok(Json(stats.into()))
}

/// POST /v1/shares/:share_id/revoke: Revoke one of the caller's shares.
#[utoipa::path(
    post,
    path = "/v1/shares/{share_id}/revoke",
    params(("share_id" = String, Path, description = "Share identifier")),
    responses(
        (status = 200, description = "Share revoked (or already revoked)", body = RevokedShare),
        (status = 401, description = "No caller identity", body = crate::error::ErrorBody),
        (status = 403, description = "Caller does not own the share", body = crate::error::ErrorBody),
        (status = 404, description = "Share does not exist", body = crate::error::ErrorBody),
    ),
    tag = "shares"
)]
pub async fn revoke_share(
    State(state): State<AppState>,
    caller: Option<CallerIdentity>,
    Path(share_id): Path<String>,
) -> Result<Json<RevokedShare>, AppError> {
    let owner = require_caller(caller)?;
    let share_id = parse_share_id(share_id)?;
    let revoked = state.lifecycle.revoke(Some(&owner), &share_id).await?;
    if !revoked.already_revoked {
        state.metrics.record_revocation();
    }
    Ok(Json(revoked))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> CreateShareRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn camel_case_fields_deserialize() {
        let req = request(serde_json::json!({
            "credentialIds": ["c1", "c2"],
            "expiryDate": "2030-01-01T00:00:00Z",
            "description": "hiring panel",
            "maxAccessCount": 3
        }));
        assert_eq!(req.credential_ids.len(), 2);
        assert_eq!(req.max_access_count, Some(3));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn missing_credential_ids_defaults_to_empty() {
        let req = request(serde_json::json!({}));
        assert!(req.credential_ids.is_empty());
    }

    #[test]
    fn empty_credential_id_fails_deserialization() {
        let parsed: Result<CreateShareRequest, _> =
            serde_json::from_value(serde_json::json!({"credentialIds": ["  "]}));
        assert!(parsed.is_err());
    }

    #[test]
    fn zero_access_limit_rejected() {
        let req = request(serde_json::json!({"credentialIds": ["c1"], "maxAccessCount": 0}));
        assert!(req.validate().is_err());
    }

    #[test]
    fn long_description_rejected() {
        let req = request(serde_json::json!({
            "credentialIds": ["c1"],
            "description": "x".repeat(MAX_DESCRIPTION_CHARS + 1)
        }));
        assert!(req.validate().is_err());

        let padded = request(serde_json::json!({
            "credentialIds": ["c1"],
            "description": format!("  {}  ", "x".repeat(MAX_DESCRIPTION_CHARS))
        }));
        assert!(padded.validate().is_ok());
    }

    #[test]
    fn too_many_credentials_rejected() {
        let ids: Vec<String> = (0..=MAX_CREDENTIALS_PER_SHARE).map(|n| format!("c{n}")).collect();
        let req = request(serde_json::json!({ "credentialIds": ids }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn request_converts_to_new_share() {
        let req = request(serde_json::json!({"credentialIds": ["c1"], "maxAccessCount": 2}));
        let new_share: NewShare = req.into();
        assert_eq!(new_share.max_access_count.map(NonZeroU64::get), Some(2));
    }
}
