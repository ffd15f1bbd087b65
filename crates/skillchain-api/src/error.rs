//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Share lifecycle failures keep their own machine-readable codes
//! (`SHARE_REVOKED`, `ACCESS_LIMIT_REACHED`, ...) so clients can tell a
//! denial apart from a malformed request. Storage and upstream failures are
//! logged and replaced with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use skillchain_state::ShareError;
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "SHARE_NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Bearer token missing the expected secret or malformed (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A dependency (credential service, database) is unreachable (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// Share lifecycle failure.
    #[error(transparent)]
    Share(#[from] ShareError),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Share(err) => (share_status(err), err.code()),
        }
    }

    /// Whether the message must be hidden from the client.
    fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Share(ShareError::PersistenceFailure(_))
                | Self::Share(ShareError::VerificationFailed(_))
        )
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Share(ShareError::InvalidCredentials { rejected }) => Some(serde_json::json!({
                "rejectedCredentialIds": rejected,
            })),
            _ => None,
        }
    }
}

fn share_status(err: &ShareError) -> StatusCode {
    match err {
        ShareError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
        ShareError::NoCredentialsSelected | ShareError::InvalidExpiryDate => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ShareError::InvalidCredentials { .. } | ShareError::NotOwner => StatusCode::FORBIDDEN,
        ShareError::ShareNotFound => StatusCode::NOT_FOUND,
        ShareError::ShareRevoked | ShareError::ShareExpired | ShareError::AccessLimitReached => {
            StatusCode::GONE
        }
        ShareError::PersistenceFailure(_) | ShareError::VerificationFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if self.is_internal() {
            tracing::error!(error = %self, code, "internal server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}
