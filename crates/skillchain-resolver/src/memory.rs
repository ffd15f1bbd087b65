//! In-process credential resolver.
//!
//! Used when no credential service is configured, and as the resolver in
//! tests. Records are keyed by normalized owner identity.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use skillchain_core::OwnerId;

use crate::error::ResolverError;
use crate::types::CredentialRecord;
use crate::CredentialResolver;

/// Thread-safe, cloneable map from owner to credential records.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialResolver {
    records: Arc<RwLock<HashMap<OwnerId, Vec<CredentialRecord>>>>,
}

impl StaticCredentialResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential to `owner`'s set, replacing any record with the
    /// same document id.
    pub fn insert(&self, owner: &OwnerId, record: CredentialRecord) {
        let mut guard = self.records.write();
        let held = guard.entry(owner.clone()).or_default();
        held.retain(|existing| existing.id != record.id);
        held.push(record);
    }

    /// Remove every credential held by `owner`.
    pub fn clear_owner(&self, owner: &OwnerId) {
        self.records.write().remove(owner);
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentialResolver {
    async fn get_credentials(&self, owner: &OwnerId) -> Result<Vec<CredentialRecord>, ResolverError> {
        Ok(self.records.read().get(owner).cloned().unwrap_or_default())
    }

    fn resolver_name(&self) -> &str {
        "StaticCredentialResolver"
    }
}
