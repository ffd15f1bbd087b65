//! # Share Persistence
//!
//! [`ShareStore`] is the storage contract for share records. Both mutating
//! operations (`admit_access`, `revoke`) are read-validate-write steps that
//! each backend must run atomically: two concurrent verifications of a share
//! with one access left must not both succeed.
//!
//! - [`MemoryShareStore`] runs the closure under a single write lock.
//! - [`PgShareStore`] runs it inside a transaction holding a row lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use skillchain_core::{OwnerId, ShareId};
use skillchain_state::{Revocation, Share, ShareError};
use sqlx::PgPool;
use thiserror::Error;

use crate::db;

/// Storage-level failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("share not found")]
    NotFound,
    #[error("share {0} already exists")]
    Duplicate(ShareId),
    /// The record exists but its state forbids the operation.
    #[error(transparent)]
    Rejected(#[from] ShareError),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

#[axum::async_trait]
pub trait ShareStore: Send + Sync {
    /// Persist a freshly issued share. Fails with `Duplicate` if the id is taken.
    async fn insert(&self, share: &Share) -> Result<(), StoreError>;

    async fn get(&self, share_id: &ShareId) -> Result<Option<Share>, StoreError>;

    /// Every share created by `owner`, in no particular order.
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Share>, StoreError>;

    /// Atomically check the share is usable at `now` and count one access.
    /// Returns the record as it stands after the increment.
    async fn admit_access(&self, share_id: &ShareId, now: DateTime<Utc>) -> Result<Share, StoreError>;

    /// Atomically deactivate a share on behalf of `caller`.
    async fn revoke(
        &self,
        share_id: &ShareId,
        caller: &OwnerId,
        now: DateTime<Utc>,
    ) -> Result<(Share, Revocation), StoreError>;

    fn backend_name(&self) -> &'static str;
}

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// The lock is `parking_lot` and is never held across `.await` points.
#[derive(Debug)]
pub struct Store<K, V> {
    data: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Store<K, V> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert only if `key` is vacant. Returns `false` when it was taken.
    pub fn insert_new(&self, key: K, value: V) -> bool {
        match self.data.write().entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.data.read().get(key).cloned()
    }

    /// Clone every value matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&V) -> bool) -> Vec<V> {
        self.data
            .read()
            .values()
            .filter(|v| predicate(v))
            .cloned()
            .collect()
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure runs under a single write lock. Returns `None` if the
    /// record doesn't exist, or `Some(result)` with the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        key: &K,
        f: impl FnOnce(&mut V) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(key).map(f)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for Store<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Backends ------------------------------------------------------------------

/// Process-local share storage. Contents do not survive a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryShareStore {
    shares: Store<ShareId, Share>,
}

impl MemoryShareStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

#[axum::async_trait]
impl ShareStore for MemoryShareStore {
    async fn insert(&self, share: &Share) -> Result<(), StoreError> {
        if self.shares.insert_new(share.share_id.clone(), share.clone()) {
            Ok(())
        } else {
            Err(StoreError::Duplicate(share.share_id.clone()))
        }
    }

    async fn get(&self, share_id: &ShareId) -> Result<Option<Share>, StoreError> {
        Ok(self.shares.get(share_id))
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Share>, StoreError> {
        Ok(self.shares.filter(|share| &share.owner == owner))
    }

    async fn admit_access(&self, share_id: &ShareId, now: DateTime<Utc>) -> Result<Share, StoreError> {
        self.shares
            .try_update(share_id, |share| -> Result<Share, StoreError> {
                share.admit(now)?;
                Ok(share.clone())
            })
            .unwrap_or(Err(StoreError::NotFound))
    }

    async fn revoke(
        &self,
        share_id: &ShareId,
        caller: &OwnerId,
        now: DateTime<Utc>,
    ) -> Result<(Share, Revocation), StoreError> {
        self.shares
            .try_update(share_id, |share| -> Result<(Share, Revocation), StoreError> {
                let outcome = share.revoke(caller, now)?;
                Ok((share.clone(), outcome))
            })
            .unwrap_or(Err(StoreError::NotFound))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Postgres-backed share storage. See [`crate::db::shares`].
#[derive(Debug, Clone)]
pub struct PgShareStore {
    pool: PgPool,
}

impl PgShareStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[axum::async_trait]
impl ShareStore for PgShareStore {
    async fn insert(&self, share: &Share) -> Result<(), StoreError> {
        db::shares::insert(&self.pool, share).await
    }

    async fn get(&self, share_id: &ShareId) -> Result<Option<Share>, StoreError> {
        db::shares::get_by_id(&self.pool, share_id).await
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Share>, StoreError> {
        db::shares::list_by_owner(&self.pool, owner).await
    }

    async fn admit_access(&self, share_id: &ShareId, now: DateTime<Utc>) -> Result<Share, StoreError> {
        db::shares::admit_access(&self.pool, share_id, now).await
    }

    async fn revoke(
        &self,
        share_id: &ShareId,
        caller: &OwnerId,
        now: DateTime<Utc>,
    ) -> Result<(Share, Revocation), StoreError> {
        db::shares::revoke(&self.pool, share_id, caller, now).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
