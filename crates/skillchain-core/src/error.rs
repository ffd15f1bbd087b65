//! # Validation Errors
//!
//! Errors raised when a raw string fails to become a domain identifier.
//! Each variant carries the rejected input so operators can diagnose
//! malformed requests from logs.

use thiserror::Error;

/// Identifier validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Share identifier does not match `share_<timestamp>_<random>`.
    #[error("invalid share ID: \"{0}\" (expected share_<base36>_<base36>)")]
    InvalidShareId(String),

    /// Owner identity is empty after normalization.
    #[error("invalid owner identity: must be non-empty")]
    EmptyOwner,

    /// Owner identity contains whitespace or control characters.
    #[error("invalid owner identity: \"{0}\" contains whitespace or control characters")]
    MalformedOwner(String),

    /// Credential identifier is empty after trimming.
    #[error("invalid credential ID: must be non-empty")]
    EmptyCredentialId,

    /// Identifier exceeds the permitted length.
    #[error("{kind} is too long: {actual} characters (maximum {max})")]
    TooLong {
        /// Which identifier kind was rejected.
        kind: &'static str,
        /// Maximum accepted length.
        max: usize,
        /// Length of the rejected input.
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_rejected_input() {
        let err = ValidationError::InvalidShareId("nope".into());
        assert!(err.to_string().contains("nope"));

        let err = ValidationError::TooLong {
            kind: "owner identity",
            max: 128,
            actual: 200,
        };
        let msg = err.to_string();
        assert!(msg.contains("owner identity"));
        assert!(msg.contains("200"));
        assert!(msg.contains("128"));
    }
}
