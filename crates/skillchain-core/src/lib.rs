//! # skillchain-core: Foundational Types for Credential Sharing
//!
//! Leaf crate of the SkillChain workspace. Defines the identifier newtypes
//! that flow through every other crate, the share token generator, and the
//! [`Clock`] seam used to make time-dependent rules testable.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `skillchain-*` crates.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.
//! - Identifiers are validated at construction and on deserialization.
//!   There is no way to hold an unvalidated `ShareId` or `OwnerId`.

pub mod clock;
pub mod error;
pub mod identity;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ValidationError;
pub use identity::{CredentialId, OwnerId, ShareId};
pub use token::generate_share_id;
