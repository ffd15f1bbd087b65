//! # Share Verification API
//!
//! `POST /v1/shares/:share_id/verify` is the endpoint a third party hits
//! when they open a shared link. It needs no authentication: possession of
//! the share id is the capability. Every successful call is counted against
//! the share's access limit.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};

use crate::error::AppError;
use crate::lifecycle::VerifiedShare;
use crate::state::AppState;

use super::parse_share_id;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/shares/:share_id/verify", post(verify_share))
}

/// POST /v1/shares/:share_id/verify: Redeem a share.
#[utoipa::path(
    post,
    path = "/v1/shares/{share_id}/verify",
    params(("share_id" = String, Path, description = "Share identifier")),
    responses(
        (status = 200, description = "Access granted; credentials returned", body = VerifiedShare),
        (status = 404, description = "Share does not exist", body = crate::error::ErrorBody),
        (status = 410, description = "Share revoked, expired or at its access limit", body = crate::error::ErrorBody),
        (status = 500, description = "Verification failed", body = crate::error::ErrorBody),
    ),
    tag = "verification"
)]
pub async fn verify_share(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
) -> Result<Json<VerifiedShare>, AppError> {
    let share_id = match parse_share_id(share_id) {
        Ok(id) => id,
        Err(err) => {
            state.metrics.record_verification("share_not_found");
            return Err(err);
        }
    };

    match state.lifecycle.verify(&share_id).await {
        Ok(verified) => {
            state.metrics.record_verification("granted");
            Ok(Json(verified))
        }
        Err(err) => {
            state
                .metrics
                .record_verification(&err.code().to_ascii_lowercase());
            Err(err.into())
        }
    }
}
