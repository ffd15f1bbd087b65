//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI document
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::auth::{require_caller, CallerIdentity};
use crate::error::AppError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SkillChain Share API",
        version = "0.1.0",
        description = "Time-boxed, access-limited sharing of verified skill credentials.",
        license(name = "MIT")
    ),
    paths(
        crate::routes::shares::create_share,
        crate::routes::shares::list_shares,
        crate::routes::shares::share_stats,
        crate::routes::shares::revoke_share,
        crate::routes::verification::verify_share,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::shares::CreateShareRequest,
        crate::routes::shares::ShareStatsResponse,
        crate::lifecycle::CreatedShare,
        crate::lifecycle::ShareSummary,
        crate::lifecycle::RevokedShare,
        crate::lifecycle::VerifiedShare,
        crate::lifecycle::ShareInfo,
    )),
    tags(
        (name = "shares", description = "Owner share management"),
        (name = "verification", description = "Public share redemption"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON document at `/openapi.json` to authenticated owners.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json(
    caller: Option<CallerIdentity>,
) -> Result<Json<utoipa::openapi::OpenApi>, AppError> {
    require_caller(caller)?;
    Ok(Json(ApiDoc::openapi()))
}
