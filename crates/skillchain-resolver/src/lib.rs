//! # skillchain-resolver: Credential Resolver
//!
//! Read-only access to the credential records an owner currently holds.
//! The sharing core never stores credential bodies: it keeps identifiers
//! and asks a [`CredentialResolver`] to materialize them at verification
//! time. A credential that has since been transferred or deleted therefore
//! drops out of a share without the share record changing.
//!
//! ## Implementations
//!
//! | Type | Backing |
//! |------|---------|
//! | [`HttpCredentialResolver`] | Credential service over HTTP (`CREDENTIALS_API_URL`) |
//! | [`StaticCredentialResolver`] | In-process map, for development and tests |
//!
//! Transport retries live here, in the collaborator. Callers in the sharing
//! core never retry.

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub(crate) mod retry;
pub mod types;

pub use config::{ConfigError, ResolverConfig};
pub use error::ResolverError;
pub use http::HttpCredentialResolver;
pub use memory::StaticCredentialResolver;
pub use types::CredentialRecord;

use async_trait::async_trait;
use skillchain_core::OwnerId;

/// Source of truth for an owner's credential records.
///
/// Implementations must be `Send + Sync` so they can be shared behind an
/// `Arc` across request handlers. The trait is object-safe so the binary
/// can pick an implementation at startup.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Every credential currently held by `owner`. An owner with no
    /// credentials yields an empty list, not an error.
    async fn get_credentials(&self, owner: &OwnerId) -> Result<Vec<CredentialRecord>, ResolverError>;

    /// Human-readable implementation name for logs.
    fn resolver_name(&self) -> &str;
}
