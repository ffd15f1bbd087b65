//! # skillchain-state: Share Lifecycle Rules
//!
//! Pure, I/O-free rules for the share capability record. Storage adapters
//! call into these rules inside their atomic section; the HTTP layer never
//! re-implements them.
//!
//! ## Share Condition
//!
//! ```text
//!             admit (count < max)
//!            ┌──────────┐
//!            ▼          │
//! create ─▶ Active ─────┴──▶ Exhausted   (accessCount == maxAccessCount)
//!            │
//!            ├──▶ Expired               (now >= expiryDate)
//!            │
//!            └──▶ Revoked  (one-way; dominates every other condition)
//! ```
//!
//! Expired and Exhausted are derived from time and counters, never stored.
//! Revocation is the only stored status transition.
//!
//! ## Evaluation Order
//!
//! Verification checks revocation, then expiry, then the access limit. A
//! share that is both revoked and expired reports revocation.

pub mod error;
pub mod share;
pub mod stats;

pub use error::ShareError;
pub use share::{Revocation, Share, ShareCondition, ShareDraft, ShareStatus};
pub use stats::ShareStats;
