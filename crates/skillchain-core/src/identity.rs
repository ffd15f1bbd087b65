//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers that cross the sharing protocol.
//! A `ShareId` cannot be passed where an `OwnerId` is expected, and every
//! constructor validates its input.
//!
//! ## Security Invariant
//!
//! `ShareId` is the bearer capability presented by unauthenticated third
//! parties. Anything that does not look like a generated token is rejected
//! before it reaches storage, so malformed or oversized path parameters
//! never become database lookups.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Prefix that distinguishes share tokens from other identifier namespaces.
pub const SHARE_ID_PREFIX: &str = "share_";

const MAX_SHARE_ID_LEN: usize = 64;
const MAX_OWNER_LEN: usize = 128;
const MAX_CREDENTIAL_ID_LEN: usize = 128;

// ── ShareId ──────────────────────────────────────────────────────────

/// Opaque, URL-safe identifier of a share.
///
/// # Validation
///
/// - Starts with `share_`
/// - Only lowercase ASCII letters, digits and `_`
/// - At most 64 characters
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareId(String);

impl ShareId {
    /// Parse a share identifier received from outside the process.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidShareId`] if the string is not a
    /// well-formed share token.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let body = match s.strip_prefix(SHARE_ID_PREFIX) {
            Some(body) => body,
            None => return Err(ValidationError::InvalidShareId(s)),
        };
        if body.is_empty()
            || s.len() > MAX_SHARE_ID_LEN
            || !body
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ValidationError::InvalidShareId(s));
        }
        Ok(Self(s))
    }

    /// Wrap a token produced by [`crate::token::generate_share_id`].
    pub(crate) fn from_generated(token: String) -> Self {
        debug_assert!(Self::parse(token.as_str()).is_ok());
        Self(token)
    }

    /// Access the token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShareId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ShareId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ShareId> for String {
    fn from(id: ShareId) -> Self {
        id.0
    }
}

// ── OwnerId ──────────────────────────────────────────────────────────

/// Identity of a credential holder, typically a wallet address.
///
/// Normalized at construction: surrounding whitespace is trimmed and the
/// value is lowercased, so `0xABC` and `0xabc` name the same owner. All
/// ownership comparisons therefore reduce to plain equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Create a normalized owner identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is empty, longer than 128 characters,
    /// or contains interior whitespace or control characters.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyOwner);
        }
        let count = trimmed.chars().count();
        if count > MAX_OWNER_LEN {
            return Err(ValidationError::TooLong {
                kind: "owner identity",
                max: MAX_OWNER_LEN,
                actual: count,
            });
        }
        if trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(ValidationError::MalformedOwner(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// Access the normalized identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OwnerId> for String {
    fn from(id: OwnerId) -> Self {
        id.0
    }
}

// ── CredentialId ─────────────────────────────────────────────────────

/// Document identifier of a credential record held by the resolver.
///
/// Case is preserved: credential identifiers are opaque keys assigned by
/// the credential store, not user-entered values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialId(String);

impl CredentialId {
    /// Create a credential identifier, trimming surrounding whitespace.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCredentialId);
        }
        let count = trimmed.chars().count();
        if count > MAX_CREDENTIAL_ID_LEN {
            return Err(ValidationError::TooLong {
                kind: "credential ID",
                max: MAX_CREDENTIAL_ID_LEN,
                actual: count,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CredentialId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CredentialId> for String {
    fn from(id: CredentialId) -> Self {
        id.0
    }
}
