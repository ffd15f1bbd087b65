//! Aggregate counters over an owner's shares.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::share::{Share, ShareCondition};

/// Owner dashboard statistics.
///
/// Every share lands in exactly one of `active`, `expired`, `revoked`.
/// `expired` covers both date expiry and an exhausted access limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareStats {
    pub total: u64,
    pub active: u64,
    pub expired: u64,
    pub revoked: u64,
    /// Sum of successful verifications across all shares.
    pub total_access: u64,
}

impl ShareStats {
    /// Tally `shares` as of `now`.
    pub fn tally<'a>(shares: impl IntoIterator<Item = &'a Share>, now: DateTime<Utc>) -> Self {
        shares.into_iter().fold(Self::default(), |mut stats, share| {
            stats.total += 1;
            stats.total_access = stats.total_access.saturating_add(share.access_count);
            match share.condition(now) {
                ShareCondition::Active => stats.active += 1,
                ShareCondition::Revoked => stats.revoked += 1,
                ShareCondition::Expired | ShareCondition::Exhausted => stats.expired += 1,
            }
            stats
        })
    }
}
