//! Credential record as served by the credential service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillchain_core::CredentialId;

/// A skill credential issued to a holder.
///
/// Optional fields use `#[serde(default)]` so records written by older
/// issuers still deserialize. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Document identifier, referenced by shares.
    pub id: CredentialId,
    /// On-ledger token number of the credential.
    pub credential_id: u64,
    pub credential_name: String,
    #[serde(default)]
    pub description: String,
    pub organization_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Wallet address of the holder.
    pub holder: String,
    /// Wallet address of the issuing organization.
    pub issuer: String,
    pub issued_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    pub skill_level: String,
    /// `false` once the issuer has revoked the credential on the ledger.
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_url: Option<String>,
}
