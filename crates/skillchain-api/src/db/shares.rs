//! Share persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `shared_credentials`
//! table. Lifecycle rules live in `skillchain_state::Share`; the mutating
//! operations load the row with `SELECT ... FOR UPDATE`, apply the rule in
//! Rust and write back inside the same transaction, so concurrent callers
//! serialize on the row lock.

use std::num::NonZeroU64;

use chrono::{DateTime, Utc};
use skillchain_core::{CredentialId, OwnerId, ShareId};
use skillchain_state::{Revocation, Share};
use sqlx::{PgPool, Postgres, Transaction};

use crate::store::StoreError;

const UNIQUE_VIOLATION: &str = "23505";

/// Insert a newly issued share.
pub async fn insert(pool: &PgPool, share: &Share) -> Result<(), StoreError> {
    let credential_ids: Vec<String> = share
        .credential_ids
        .iter()
        .map(|id| id.as_str().to_string())
        .collect();

    let result = sqlx::query(
        "INSERT INTO shared_credentials
            (share_id, owner, credential_ids, created_at, expiry_date, max_access_count,
             access_count, is_active, description, last_accessed_at, revoked_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(share.share_id.as_str())
    .bind(share.owner.as_str())
    .bind(&credential_ids)
    .bind(share.created_at)
    .bind(share.expiry_date)
    .bind(share.max_access_count.map(|n| to_i64(n.get())).transpose()?)
    .bind(to_i64(share.access_count)?)
    .bind(share.is_active)
    .bind(&share.description)
    .bind(share.last_accessed_at)
    .bind(share.revoked_at)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Err(StoreError::Duplicate(share.share_id.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Fetch a share by ID.
pub async fn get_by_id(pool: &PgPool, share_id: &ShareId) -> Result<Option<Share>, StoreError> {
    let row = sqlx::query_as::<_, ShareRow>(
        "SELECT share_id, owner, credential_ids, created_at, expiry_date, max_access_count,
                access_count, is_active, description, last_accessed_at, revoked_at
         FROM shared_credentials WHERE share_id = $1",
    )
    .bind(share_id.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(ShareRow::into_share).transpose()
}

/// All shares created by `owner`, newest first.
pub async fn list_by_owner(pool: &PgPool, owner: &OwnerId) -> Result<Vec<Share>, StoreError> {
    let rows = sqlx::query_as::<_, ShareRow>(
        "SELECT share_id, owner, credential_ids, created_at, expiry_date, max_access_count,
                access_count, is_active, description, last_accessed_at, revoked_at
         FROM shared_credentials WHERE owner = $1 ORDER BY created_at DESC",
    )
    .bind(owner.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ShareRow::into_share).collect()
}

/// Count one access if the share is usable at `now`.
pub async fn admit_access(
    pool: &PgPool,
    share_id: &ShareId,
    now: DateTime<Utc>,
) -> Result<Share, StoreError> {
    let mut tx = pool.begin().await?;
    let mut share = lock_share(&mut tx, share_id).await?;

    share.admit(now)?;

    sqlx::query(
        "UPDATE shared_credentials SET access_count = $1, last_accessed_at = $2 WHERE share_id = $3",
    )
    .bind(to_i64(share.access_count)?)
    .bind(share.last_accessed_at)
    .bind(share_id.as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(share)
}

/// Deactivate a share on behalf of `caller`. A repeat revocation leaves the
/// row untouched.
pub async fn revoke(
    pool: &PgPool,
    share_id: &ShareId,
    caller: &OwnerId,
    now: DateTime<Utc>,
) -> Result<(Share, Revocation), StoreError> {
    let mut tx = pool.begin().await?;
    let mut share = lock_share(&mut tx, share_id).await?;

    let outcome = share.revoke(caller, now)?;

    if outcome == Revocation::Revoked {
        sqlx::query(
            "UPDATE shared_credentials SET is_active = FALSE, revoked_at = $1 WHERE share_id = $2",
        )
        .bind(share.revoked_at)
        .bind(share_id.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok((share, outcome))
}

/// Load a share and hold its row lock until the transaction ends.
async fn lock_share(
    tx: &mut Transaction<'_, Postgres>,
    share_id: &ShareId,
) -> Result<Share, StoreError> {
    let row = sqlx::query_as::<_, ShareRow>(
        "SELECT share_id, owner, credential_ids, created_at, expiry_date, max_access_count,
                access_count, is_active, description, last_accessed_at, revoked_at
         FROM shared_credentials WHERE share_id = $1 FOR UPDATE",
    )
    .bind(share_id.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    row.ok_or(StoreError::NotFound)?.into_share()
}

fn to_i64(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Backend(format!("counter {value} exceeds BIGINT")))
}

fn corrupt(column: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("corrupt shared_credentials.{column}: {detail}"))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ShareRow {
    share_id: String,
    owner: String,
    credential_ids: Vec<String>,
    created_at: DateTime<Utc>,
    expiry_date: Option<DateTime<Utc>>,
    max_access_count: Option<i64>,
    access_count: i64,
    is_active: bool,
    description: Option<String>,
    last_accessed_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
}

impl ShareRow {
    fn into_share(self) -> Result<Share, StoreError> {
        let credential_ids = self
            .credential_ids
            .iter()
            .map(CredentialId::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt("credential_ids", e))?;

        let max_access_count = self
            .max_access_count
            .map(|n| {
                u64::try_from(n)
                    .ok()
                    .and_then(NonZeroU64::new)
                    .ok_or_else(|| corrupt("max_access_count", n))
            })
            .transpose()?;

        Ok(Share {
            share_id: ShareId::parse(self.share_id).map_err(|e| corrupt("share_id", e))?,
            owner: OwnerId::new(&self.owner).map_err(|e| corrupt("owner", e))?,
            credential_ids,
            created_at: self.created_at,
            expiry_date: self.expiry_date,
            max_access_count,
            access_count: u64::try_from(self.access_count)
                .map_err(|_| corrupt("access_count", self.access_count))?,
            is_active: self.is_active,
            description: self.description,
            last_accessed_at: self.last_accessed_at,
            revoked_at: self.revoked_at,
        })
    }
}
