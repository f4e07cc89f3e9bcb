//! # Hashing
//!
//! Keccak-256 helpers used for request identifiers and commitments.

use crate::values::Hash;
use sha3::{Digest, Keccak256};

/// Computes the Keccak-256 hash of the given data.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let hash = Keccak256::digest(data);
    Hash::new(hash.into())
}

/// Computes the Keccak-256 hash of the concatenation of the given slices.
///
/// Equivalent to hashing the tightly packed encoding of the inputs.
#[must_use]
pub fn keccak256_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash::new(hasher.finalize().into())
}
