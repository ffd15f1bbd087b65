//! # API Route Modules
//!
//! - `shares`: owner-scoped share management (create, list, stats, revoke).
//!   Mounted behind the auth middleware.
//! - `verification`: public share redemption. Mounted without auth.

pub mod shares;
pub mod verification;

use skillchain_core::ShareId;
use skillchain_state::ShareError;

use crate::error::AppError;

/// Parse a share id from a path segment. Anything malformed cannot name an
/// existing share and is reported as `SHARE_NOT_FOUND`.
pub(crate) fn parse_share_id(raw: String) -> Result<ShareId, AppError> {
    ShareId::parse(raw).map_err(|_| AppError::Share(ShareError::ShareNotFound))
}
