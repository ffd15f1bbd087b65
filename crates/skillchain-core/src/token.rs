//! # Share Token Generation
//!
//! A share token is `share_<millis>_<random>`, both parts base-36.
//!
//! The timestamp part only makes tokens roughly sortable by creation time
//! in logs. Uniqueness and unguessability come entirely from the random
//! part: 128 bits drawn from the operating system CSPRNG.

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};

use crate::identity::{ShareId, SHARE_ID_PREFIX};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a fresh share identifier for a share created at `now`.
pub fn generate_share_id(now: DateTime<Utc>) -> ShareId {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    compose(now, u128::from_be_bytes(bytes))
}

fn compose(now: DateTime<Utc>, random: u128) -> ShareId {
    // Pre-epoch clocks clamp to zero rather than producing a sign character.
    let millis = u128::try_from(now.timestamp_millis()).unwrap_or(0);
    let token = format!(
        "{SHARE_ID_PREFIX}{}_{}",
        to_base36(millis),
        to_base36(random)
    );
    ShareId::from_generated(token)
}

/// Encode an unsigned integer in lowercase base-36.
pub(crate) fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(25);
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}
