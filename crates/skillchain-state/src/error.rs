//! # Share Errors
//!
//! The complete failure taxonomy of the sharing protocol. Every variant has
//! a stable machine-readable code (see [`ShareError::code`]) that clients
//! branch on, and a human-readable message that they may display.
//!
//! Verification failures deliberately say nothing about the owner beyond
//! what the share metadata already reveals.

use skillchain_core::CredentialId;
use thiserror::Error;

/// Failure of a share lifecycle operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// No authenticated owner identity accompanied the request.
    #[error("authentication is required to manage shares")]
    AuthenticationRequired,

    /// The create request named no credentials.
    #[error("select at least one credential to share")]
    NoCredentialsSelected,

    /// The create request named credentials the caller does not hold.
    #[error("{} selected credential(s) do not belong to the caller", rejected.len())]
    InvalidCredentials {
        /// The offending credential identifiers.
        rejected: Vec<CredentialId>,
    },

    /// The requested expiry is not strictly in the future.
    #[error("expiry date must be in the future")]
    InvalidExpiryDate,

    /// No share exists under the presented identifier.
    #[error("this share does not exist or has been deleted")]
    ShareNotFound,

    /// The owner revoked the share.
    #[error("this shared credential access has been revoked")]
    ShareRevoked,

    /// The share's expiry date has passed.
    #[error("this shared credential access has expired")]
    ShareExpired,

    /// The share has been verified `maxAccessCount` times already.
    #[error("this share has reached its maximum access limit")]
    AccessLimitReached,

    /// Caller attempted to revoke a share they do not own.
    #[error("only the owner of a share can revoke it")]
    NotOwner,

    /// The share store rejected or failed a read or write.
    #[error("share storage failed: {0}")]
    PersistenceFailure(String),

    /// Unexpected store or resolver failure while verifying a share.
    #[error("share verification failed: {0}")]
    VerificationFailed(String),
}

impl ShareError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            Self::NoCredentialsSelected => "NO_CREDENTIALS_SELECTED",
            Self::InvalidCredentials { .. } => "INVALID_CREDENTIALS",
            Self::InvalidExpiryDate => "INVALID_EXPIRY_DATE",
            Self::ShareNotFound => "SHARE_NOT_FOUND",
            Self::ShareRevoked => "SHARE_REVOKED",
            Self::ShareExpired => "SHARE_EXPIRED",
            Self::AccessLimitReached => "ACCESS_LIMIT_REACHED",
            Self::NotOwner => "NOT_OWNER",
            Self::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            Self::VerificationFailed(_) => "VERIFICATION_FAILED",
        }
    }

    /// Whether this is a terminal verification outcome for the share itself
    /// (as opposed to a malformed request or an infrastructure failure).
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::ShareNotFound | Self::ShareRevoked | Self::ShareExpired | Self::AccessLimitReached
        )
    }
}
