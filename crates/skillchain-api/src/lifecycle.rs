//! # Share Lifecycle
//!
//! Orchestrates the five share operations over a [`ShareStore`], a
//! [`CredentialResolver`] and a [`Clock`]. Route handlers translate HTTP
//! into calls here; nothing in this module knows about axum.
//!
//! ```text
//! create ──▶ store.insert
//! verify ──▶ store.admit_access ──▶ resolver.get_credentials(owner)
//! revoke ──▶ store.revoke
//! list   ──▶ store.list_by_owner ──▶ resolver.get_credentials(owner) ──▶ derive status + links
//! stats  ──▶ store.list_by_owner ──▶ ShareStats::tally
//! ```
//!
//! A verification is counted once admission commits, even if fetching the
//! credentials afterwards fails.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use skillchain_core::{generate_share_id, Clock, CredentialId, OwnerId, ShareId};
use skillchain_resolver::{CredentialRecord, CredentialResolver, ResolverError};
use skillchain_state::{Revocation, Share, ShareDraft, ShareError, ShareStats, ShareStatus};
use utoipa::ToSchema;

use crate::links::LinkBuilder;
use crate::store::{ShareStore, StoreError};

/// Owner input for a new share, after request validation.
#[derive(Debug, Clone, Default)]
pub struct NewShare {
    pub credential_ids: Vec<CredentialId>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub max_access_count: Option<NonZeroU64>,
}

/// Result of a successful `create`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedShare {
    #[schema(value_type = String, example = "share_loyw3v28_1x2k9q7fz3b")]
    pub share_id: ShareId,
    pub verification_url: String,
    pub qr_code_url: String,
    pub created_at: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Share metadata returned to a verifier alongside the credentials.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareInfo {
    #[schema(value_type = String)]
    pub share_id: ShareId,
    #[schema(value_type = String)]
    pub owner: OwnerId,
    #[schema(value_type = Vec<String>)]
    pub credential_ids: Vec<CredentialId>,
    pub created_at: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    /// Count including the verification that produced this response.
    pub access_count: u64,
    #[schema(value_type = Option<u64>)]
    pub max_access_count: Option<NonZeroU64>,
    /// Always `false` on a successful verification.
    pub is_expired: bool,
}

/// Successful verification: the shared credentials and the share metadata.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedShare {
    /// Credential records in the order the owner selected them. Records the
    /// owner no longer holds are omitted.
    #[schema(value_type = Vec<Object>)]
    pub credentials: Vec<CredentialRecord>,
    pub share_info: ShareInfo,
}

/// One row of the owner dashboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareSummary {
    #[schema(value_type = String)]
    pub share_id: ShareId,
    #[schema(value_type = Vec<String>)]
    pub credential_ids: Vec<CredentialId>,
    /// Records behind `credential_ids` that the owner still holds, in share
    /// order. Empty when the credential service could not be reached.
    #[schema(value_type = Vec<Object>)]
    pub credentials: Vec<CredentialRecord>,
    pub created_at: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub access_count: u64,
    #[schema(value_type = Option<u64>)]
    pub max_access_count: Option<NonZeroU64>,
    /// Whether the share would admit a verification right now.
    pub is_active: bool,
    #[schema(value_type = String, example = "active")]
    pub status: ShareStatus,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub verification_url: String,
    pub qr_code_url: String,
}

/// Result of a successful `revoke`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokedShare {
    #[schema(value_type = String)]
    pub share_id: ShareId,
    /// Instant of the first revocation.
    pub revoked_at: Option<DateTime<Utc>>,
    /// `true` when this call found the share already revoked.
    pub already_revoked: bool,
}

/// Share lifecycle service.
pub struct ShareLifecycle {
    store: Arc<dyn ShareStore>,
    resolver: Arc<dyn CredentialResolver>,
    clock: Arc<dyn Clock>,
    links: LinkBuilder,
}

impl std::fmt::Debug for ShareLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareLifecycle")
            .field("store", &self.store.backend_name())
            .field("resolver", &self.resolver.resolver_name())
            .field("links", &self.links)
            .finish()
    }
}

impl ShareLifecycle {
    pub fn new(
        store: Arc<dyn ShareStore>,
        resolver: Arc<dyn CredentialResolver>,
        clock: Arc<dyn Clock>,
        links: LinkBuilder,
    ) -> Self {
        Self {
            store,
            resolver,
            clock,
            links,
        }
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Credentials currently held by `owner`, used for the ownership check
    /// on create.
    pub async fn owned_credentials(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<CredentialRecord>, ResolverError> {
        self.resolver.get_credentials(owner).await
    }

    /// Issue a new share for `caller` over a subset of `owned`.
    ///
    /// Checks run in order: authentication, non-empty selection, ownership
    /// of every selected credential, expiry in the future. Nothing is
    /// persisted unless all of them pass.
    pub async fn create(
        &self,
        caller: Option<&OwnerId>,
        owned: &[CredentialRecord],
        request: NewShare,
    ) -> Result<CreatedShare, ShareError> {
        let owner = caller.ok_or(ShareError::AuthenticationRequired)?;

        if request.credential_ids.is_empty() {
            return Err(ShareError::NoCredentialsSelected);
        }

        let held: HashSet<&CredentialId> = owned.iter().map(|c| &c.id).collect();
        let mut rejected: Vec<CredentialId> = Vec::new();
        for id in &request.credential_ids {
            if !held.contains(id) && !rejected.contains(id) {
                rejected.push(id.clone());
            }
        }
        if !rejected.is_empty() {
            tracing::warn!(
                owner = %owner,
                rejected = rejected.len(),
                "share creation rejected: credentials not owned by caller"
            );
            return Err(ShareError::InvalidCredentials { rejected });
        }

        let now = self.clock.now();
        let share = Share::issue(
            generate_share_id(now),
            ShareDraft {
                owner: owner.clone(),
                credential_ids: request.credential_ids,
                expiry_date: request.expiry_date,
                description: request.description,
                max_access_count: request.max_access_count,
            },
            now,
        )?;

        self.store.insert(&share).await.map_err(|e| {
            tracing::error!(share_id = %share.share_id, error = %e, "failed to persist share");
            ShareError::PersistenceFailure(e.to_string())
        })?;

        tracing::info!(
            share_id = %share.share_id,
            owner = %owner,
            credentials = share.credential_ids.len(),
            expiry = ?share.expiry_date,
            max_access = ?share.max_access_count,
            "share created"
        );

        Ok(CreatedShare {
            verification_url: self.links.verification_url(&share.share_id),
            qr_code_url: self.links.qr_code_url(&share.share_id),
            share_id: share.share_id,
            created_at: share.created_at,
            expiry_date: share.expiry_date,
        })
    }

    /// Redeem a share: count one access and return the shared credentials.
    pub async fn verify(&self, share_id: &ShareId) -> Result<VerifiedShare, ShareError> {
        let result = self.admit_and_resolve(share_id).await;
        match &result {
            Ok(verified) => tracing::info!(
                share_id = %share_id,
                access_count = verified.share_info.access_count,
                "share verified"
            ),
            Err(err) if err.is_denial() => {
                tracing::info!(share_id = %share_id, reason = err.code(), "share access denied")
            }
            Err(err) => tracing::error!(share_id = %share_id, error = %err, "share verification failed"),
        }
        result
    }

    async fn admit_and_resolve(&self, share_id: &ShareId) -> Result<VerifiedShare, ShareError> {
        let now = self.clock.now();
        let share = self
            .store
            .admit_access(share_id, now)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ShareError::ShareNotFound,
                StoreError::Rejected(denial) => denial,
                other => ShareError::VerificationFailed(other.to_string()),
            })?;

        let records = self
            .resolver
            .get_credentials(&share.owner)
            .await
            .map_err(|e| ShareError::VerificationFailed(e.to_string()))?;

        Ok(VerifiedShare {
            credentials: select_shared(&share.credential_ids, records),
            share_info: ShareInfo {
                share_id: share.share_id,
                owner: share.owner,
                credential_ids: share.credential_ids,
                created_at: share.created_at,
                expiry_date: share.expiry_date,
                description: share.description,
                access_count: share.access_count,
                max_access_count: share.max_access_count,
                is_expired: false,
            },
        })
    }

    /// Revoke `share_id` on behalf of `caller`. Revoking twice succeeds and
    /// keeps the first `revoked_at`.
    pub async fn revoke(
        &self,
        caller: Option<&OwnerId>,
        share_id: &ShareId,
    ) -> Result<RevokedShare, ShareError> {
        let caller = caller.ok_or(ShareError::AuthenticationRequired)?;
        let now = self.clock.now();

        let (share, outcome) = self
            .store
            .revoke(share_id, caller, now)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ShareError::ShareNotFound,
                StoreError::Rejected(ShareError::NotOwner) => {
                    tracing::warn!(share_id = %share_id, caller = %caller, "revocation refused: caller is not the owner");
                    ShareError::NotOwner
                }
                StoreError::Rejected(err) => err,
                other => ShareError::PersistenceFailure(other.to_string()),
            })?;

        let already_revoked = outcome == Revocation::AlreadyRevoked;
        if already_revoked {
            tracing::debug!(share_id = %share_id, "share already revoked");
        } else {
            tracing::info!(share_id = %share_id, owner = %caller, "share revoked");
        }

        Ok(RevokedShare {
            share_id: share.share_id,
            revoked_at: share.revoked_at,
            already_revoked,
        })
    }

    /// Every share `caller` created, newest first, with the credential
    /// records each one exposes.
    ///
    /// The owner's records are fetched once. If the credential service is
    /// down the listing is still returned, with empty `credentials`.
    pub async fn list_shares(&self, caller: Option<&OwnerId>) -> Result<Vec<ShareSummary>, ShareError> {
        let owner = caller.ok_or(ShareError::AuthenticationRequired)?;
        let shares = self.owned_shares(Some(owner)).await?;
        let records = if shares.is_empty() {
            Vec::new()
        } else {
            self.resolver.get_credentials(owner).await.unwrap_or_else(|e| {
                tracing::warn!(owner = %owner, error = %e, "credential lookup failed while listing shares");
                Vec::new()
            })
        };

        let now = self.clock.now();
        Ok(shares
            .into_iter()
            .map(|share| {
                let credentials = select_shared(&share.credential_ids, records.clone());
                if credentials.len() < share.credential_ids.len() {
                    tracing::warn!(
                        share_id = %share.share_id,
                        missing = share.credential_ids.len() - credentials.len(),
                        "share references credentials the owner no longer holds"
                    );
                }
                self.summarize(share, credentials, now)
            })
            .collect())
    }

    /// Dashboard counters over `caller`'s shares.
    pub async fn stats(&self, caller: Option<&OwnerId>) -> Result<ShareStats, ShareError> {
        let shares = self.owned_shares(caller).await?;
        Ok(ShareStats::tally(&shares, self.clock.now()))
    }

    async fn owned_shares(&self, caller: Option<&OwnerId>) -> Result<Vec<Share>, ShareError> {
        let owner = caller.ok_or(ShareError::AuthenticationRequired)?;
        let mut shares = self
            .store
            .list_by_owner(owner)
            .await
            .map_err(|e| ShareError::PersistenceFailure(e.to_string()))?;
        shares.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.share_id.cmp(&a.share_id))
        });
        Ok(shares)
    }

    fn summarize(
        &self,
        share: Share,
        credentials: Vec<CredentialRecord>,
        now: DateTime<Utc>,
    ) -> ShareSummary {
        let status = share.status(now);
        ShareSummary {
            verification_url: self.links.verification_url(&share.share_id),
            qr_code_url: self.links.qr_code_url(&share.share_id),
            is_active: status == ShareStatus::Active,
            status,
            share_id: share.share_id,
            credential_ids: share.credential_ids,
            credentials,
            created_at: share.created_at,
            expiry_date: share.expiry_date,
            description: share.description,
            access_count: share.access_count,
            max_access_count: share.max_access_count,
            last_accessed_at: share.last_accessed_at,
            revoked_at: share.revoked_at,
        }
    }
}

/// Pick the shared records out of the owner's full set, in share order.
fn select_shared(ids: &[CredentialId], records: Vec<CredentialRecord>) -> Vec<CredentialRecord> {
    let mut by_id: HashMap<CredentialId, CredentialRecord> =
        records.into_iter().map(|r| (r.id.clone(), r)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
