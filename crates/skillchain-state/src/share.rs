//! # Share Record
//!
//! A share grants bearer access to a fixed subset of one owner's
//! credentials. The record is created once, then mutated only by
//! verification (`access_count`, `last_accessed_at`) and revocation
//! (`is_active`, `revoked_at`). It is never deleted.
//!
//! ## Invariants
//!
//! - `credential_ids` is non-empty and duplicate-free.
//! - `access_count` never decreases and never exceeds `max_access_count`.
//! - `is_active` only ever goes from `true` to `false`.
//!
//! [`Share::admit`] and [`Share::revoke`] are the only mutators. Storage
//! adapters must run them inside a single atomic read-modify-write so that
//! concurrent verifications cannot both pass the access-limit check.

use std::collections::HashSet;
use std::num::NonZeroU64;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillchain_core::{CredentialId, OwnerId, ShareId};

use crate::error::ShareError;

/// Validated input for a new share, minus the identifier and timestamps.
#[derive(Debug, Clone)]
pub struct ShareDraft {
    /// Authenticated owner creating the share.
    pub owner: OwnerId,
    /// Credentials to expose, in the order the owner selected them.
    pub credential_ids: Vec<CredentialId>,
    /// Instant after which the share stops admitting verifications.
    pub expiry_date: Option<DateTime<Utc>>,
    /// Free-text label shown to the owner.
    pub description: Option<String>,
    /// Cap on successful verifications.
    pub max_access_count: Option<NonZeroU64>,
}

/// Persisted share record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub share_id: ShareId,
    pub owner: OwnerId,
    pub credential_ids: Vec<CredentialId>,
    pub created_at: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub max_access_count: Option<NonZeroU64>,
    pub access_count: u64,
    pub is_active: bool,
    pub description: Option<String>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Effective condition of a share at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareCondition {
    /// Admits verifications.
    Active,
    /// Explicitly revoked by the owner.
    Revoked,
    /// Past its expiry date.
    Expired,
    /// Access limit used up.
    Exhausted,
}

/// Owner-facing display status.
///
/// Collapses every non-admitting condition into `Expired`. This is not the
/// stored `is_active` flag, which only reflects explicit revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    Active,
    Expired,
}

/// Outcome of a successful revocation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation {
    /// The share transitioned to revoked by this call.
    Revoked,
    /// The share was already revoked. Nothing changed.
    AlreadyRevoked,
}

impl Share {
    /// Build a fresh share from a draft.
    ///
    /// Duplicate credential identifiers are collapsed, keeping the first
    /// occurrence. A blank description becomes `None`.
    ///
    /// # Errors
    ///
    /// - [`ShareError::NoCredentialsSelected`] if no credentials remain.
    /// - [`ShareError::InvalidExpiryDate`] if `expiry_date <= now`.
    pub fn issue(share_id: ShareId, draft: ShareDraft, now: DateTime<Utc>) -> Result<Self, ShareError> {
        let credential_ids = dedup_preserving_order(draft.credential_ids);
        if credential_ids.is_empty() {
            return Err(ShareError::NoCredentialsSelected);
        }
        if let Some(expiry) = draft.expiry_date {
            if expiry <= now {
                return Err(ShareError::InvalidExpiryDate);
            }
        }
        let description = draft
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            share_id,
            owner: draft.owner,
            credential_ids,
            created_at: now,
            expiry_date: draft.expiry_date,
            max_access_count: draft.max_access_count,
            access_count: 0,
            is_active: true,
            description,
            last_accessed_at: None,
            revoked_at: None,
        })
    }

    /// Whether the expiry date has been reached at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|expiry| now >= expiry)
    }

    /// Whether the access limit has been used up.
    pub fn is_exhausted(&self) -> bool {
        self.max_access_count
            .is_some_and(|max| self.access_count >= max.get())
    }

    /// Evaluate the share's condition at `now`: revoked, then expired, then
    /// exhausted.
    pub fn condition(&self, now: DateTime<Utc>) -> ShareCondition {
        if !self.is_active {
            ShareCondition::Revoked
        } else if self.is_expired_at(now) {
            ShareCondition::Expired
        } else if self.is_exhausted() {
            ShareCondition::Exhausted
        } else {
            ShareCondition::Active
        }
    }

    /// Owner-facing status at `now`.
    pub fn status(&self, now: DateTime<Utc>) -> ShareStatus {
        match self.condition(now) {
            ShareCondition::Active => ShareStatus::Active,
            _ => ShareStatus::Expired,
        }
    }

    /// Admit one verification at `now`.
    ///
    /// On success `access_count` is incremented by exactly one and
    /// `last_accessed_at` is set. On failure the record is untouched.
    pub fn admit(&mut self, now: DateTime<Utc>) -> Result<(), ShareError> {
        match self.condition(now) {
            ShareCondition::Revoked => Err(ShareError::ShareRevoked),
            ShareCondition::Expired => Err(ShareError::ShareExpired),
            ShareCondition::Exhausted => Err(ShareError::AccessLimitReached),
            ShareCondition::Active => {
                self.access_count += 1;
                self.last_accessed_at = Some(now);
                Ok(())
            }
        }
    }

    /// Revoke the share on behalf of `caller`.
    ///
    /// Repeat revocation succeeds without touching the record, so
    /// `revoked_at` always records the first revocation.
    pub fn revoke(&mut self, caller: &OwnerId, now: DateTime<Utc>) -> Result<Revocation, ShareError> {
        if &self.owner != caller {
            return Err(ShareError::NotOwner);
        }
        if !self.is_active {
            return Ok(Revocation::AlreadyRevoked);
        }
        self.is_active = false;
        self.revoked_at = Some(now);
        Ok(Revocation::Revoked)
    }
}

fn dedup_preserving_order(ids: Vec<CredentialId>) -> Vec<CredentialId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn owner() -> OwnerId {
        OwnerId::new("0xOwnerA").unwrap()
    }

    fn cred(id: &str) -> CredentialId {
        CredentialId::new(id).unwrap()
    }

    fn draft() -> ShareDraft {
        ShareDraft {
            owner: owner(),
            credential_ids: vec![cred("c1"), cred("c2")],
            expiry_date: None,
            description: None,
            max_access_count: None,
        }
    }

    fn issue(draft: ShareDraft) -> Share {
        Share::issue(ShareId::parse("share_test_1").unwrap(), draft, t0()).unwrap()
    }

    // ── Creation ─────────────────────────────────────────────────────

    #[test]
    fn issued_share_starts_active_and_unused() {
        let share = issue(draft());
        assert_eq!(share.access_count, 0);
        assert!(share.is_active);
        assert_eq!(share.created_at, t0());
        assert!(share.revoked_at.is_none());
        assert!(share.last_accessed_at.is_none());
        assert_eq!(share.condition(t0()), ShareCondition::Active);
    }

    #[test]
    fn issue_collapses_duplicate_credentials_in_order() {
        let mut d = draft();
        d.credential_ids = vec![cred("c2"), cred("c1"), cred("c2")];
        let share = issue(d);
        assert_eq!(share.credential_ids, vec![cred("c2"), cred("c1")]);
    }

    #[test]
    fn issue_rejects_empty_selection() {
        let mut d = draft();
        d.credential_ids.clear();
        let err = Share::issue(ShareId::parse("share_x").unwrap(), d, t0()).unwrap_err();
        assert_eq!(err, ShareError::NoCredentialsSelected);
    }

    #[test]
    fn issue_rejects_expiry_at_or_before_now() {
        for expiry in [t0(), t0() - Duration::seconds(1)] {
            let mut d = draft();
            d.expiry_date = Some(expiry);
            let err = Share::issue(ShareId::parse("share_x").unwrap(), d, t0()).unwrap_err();
            assert_eq!(err, ShareError::InvalidExpiryDate);
        }
    }

    #[test]
    fn issue_blank_description_becomes_none() {
        let mut d = draft();
        d.description = Some("   ".into());
        assert!(issue(d).description.is_none());

        let mut d = draft();
        d.description = Some("  for the recruiter ".into());
        assert_eq!(issue(d).description.as_deref(), Some("for the recruiter"));
    }

    // ── Admission ────────────────────────────────────────────────────

    #[test]
    fn admit_increments_and_stamps_access_time() {
        let mut share = issue(draft());
        let later = t0() + Duration::minutes(3);
        share.admit(later).unwrap();
        assert_eq!(share.access_count, 1);
        assert_eq!(share.last_accessed_at, Some(later));
        share.admit(later).unwrap();
        assert_eq!(share.access_count, 2);
    }

    #[test]
    fn admit_stops_at_access_limit() {
        let mut d = draft();
        d.max_access_count = NonZeroU64::new(2);
        let mut share = issue(d);
        share.admit(t0()).unwrap();
        share.admit(t0()).unwrap();
        assert_eq!(share.admit(t0()), Err(ShareError::AccessLimitReached));
        assert_eq!(share.access_count, 2);
        assert!(share.is_exhausted());
    }

    #[test]
    fn admit_rejects_at_exact_expiry_instant() {
        let mut d = draft();
        d.expiry_date = Some(t0() + Duration::hours(1));
        let mut share = issue(d);
        assert!(share.admit(t0() + Duration::minutes(59)).is_ok());
        assert_eq!(
            share.admit(t0() + Duration::hours(1)),
            Err(ShareError::ShareExpired)
        );
        assert_eq!(share.access_count, 1);
    }

    #[test]
    fn revoked_and_expired_reports_revoked() {
        let mut d = draft();
        d.expiry_date = Some(t0() + Duration::hours(1));
        let mut share = issue(d);
        share.revoke(&owner(), t0()).unwrap();
        let after_expiry = t0() + Duration::days(2);
        assert_eq!(share.condition(after_expiry), ShareCondition::Revoked);
        assert_eq!(share.admit(after_expiry), Err(ShareError::ShareRevoked));
    }

    #[test]
    fn expired_and_exhausted_reports_expired() {
        let mut d = draft();
        d.expiry_date = Some(t0() + Duration::hours(1));
        d.max_access_count = NonZeroU64::new(1);
        let mut share = issue(d);
        share.admit(t0()).unwrap();
        assert_eq!(
            share.admit(t0() + Duration::hours(2)),
            Err(ShareError::ShareExpired)
        );
    }

    #[test]
    fn failed_admission_leaves_record_untouched() {
        let mut share = issue(draft());
        share.revoke(&owner(), t0()).unwrap();
        let before = share.clone();
        let _ = share.admit(t0() + Duration::minutes(1));
        assert_eq!(share, before);
    }

    // ── Revocation ───────────────────────────────────────────────────

    #[test]
    fn revoke_by_owner_sets_flag_and_timestamp() {
        let mut share = issue(draft());
        let at = t0() + Duration::minutes(10);
        assert_eq!(share.revoke(&owner(), at), Ok(Revocation::Revoked));
        assert!(!share.is_active);
        assert_eq!(share.revoked_at, Some(at));
    }

    #[test]
    fn revoke_compares_normalized_identity() {
        let mut share = issue(draft());
        let shouting = OwnerId::new("0XOWNERA").unwrap();
        assert!(share.revoke(&shouting, t0()).is_ok());
    }

    #[test]
    fn revoke_by_stranger_is_rejected() {
        let mut share = issue(draft());
        let stranger = OwnerId::new("0xStranger").unwrap();
        assert_eq!(share.revoke(&stranger, t0()), Err(ShareError::NotOwner));
        assert!(share.is_active);
    }

    #[test]
    fn repeat_revoke_keeps_first_timestamp() {
        let mut share = issue(draft());
        share.revoke(&owner(), t0()).unwrap();
        let again = share.revoke(&owner(), t0() + Duration::days(1));
        assert_eq!(again, Ok(Revocation::AlreadyRevoked));
        assert_eq!(share.revoked_at, Some(t0()));
    }

    // ── Status ───────────────────────────────────────────────────────

    #[test]
    fn display_status_collapses_inactive_conditions() {
        let mut d = draft();
        d.max_access_count = NonZeroU64::new(1);
        let mut share = issue(d);
        assert_eq!(share.status(t0()), ShareStatus::Active);
        share.admit(t0()).unwrap();
        assert_eq!(share.condition(t0()), ShareCondition::Exhausted);
        assert_eq!(share.status(t0()), ShareStatus::Expired);
        // Stored flag is untouched by exhaustion.
        assert!(share.is_active);
    }

    // ── Serialization ────────────────────────────────────────────────

    #[test]
    fn share_serializes_with_camel_case_fields() {
        let mut d = draft();
        d.max_access_count = NonZeroU64::new(5);
        let share = issue(d);
        let json = serde_json::to_value(&share).unwrap();
        assert_eq!(json["shareId"], "share_test_1");
        assert_eq!(json["owner"], "0xownera");
        assert_eq!(json["accessCount"], 0);
        assert_eq!(json["maxAccessCount"], 5);
        assert_eq!(json["isActive"], true);
        assert!(json["revokedAt"].is_null());

        let parsed: Share = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, share);
    }

    #[test]
    fn zero_access_limit_is_not_deserializable() {
        let mut json = serde_json::to_value(issue(draft())).unwrap();
        json["maxAccessCount"] = serde_json::json!(0);
        assert!(serde_json::from_value::<Share>(json).is_err());
    }

    proptest! {
        #[test]
        fn never_admits_more_than_limit(max in 1u64..20, attempts in 0usize..50) {
            let mut d = draft();
            d.max_access_count = NonZeroU64::new(max);
            let mut share = issue(d);
            let granted = (0..attempts).filter(|_| share.admit(t0()).is_ok()).count() as u64;
            prop_assert_eq!(granted, max.min(attempts as u64));
            prop_assert!(share.access_count <= max);
        }

        #[test]
        fn revocation_blocks_all_later_admissions(before in 0usize..5, after in 1usize..10, offset_mins in 0i64..10_000) {
            let mut share = issue(draft());
            for _ in 0..before {
                share.admit(t0()).unwrap();
            }
            share.revoke(&owner(), t0()).unwrap();
            for _ in 0..after {
                prop_assert_eq!(
                    share.admit(t0() + Duration::minutes(offset_mins)),
                    Err(ShareError::ShareRevoked)
                );
            }
            prop_assert_eq!(share.access_count, before as u64);
        }
    }
}
