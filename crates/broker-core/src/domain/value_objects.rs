//! # Value Objects
//!
//! Immutable domain primitives for the broker protocol.

use broker_types::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requester-side nonce used to derive request identifiers.
pub type Nonce = u64;

// =============================================================================
// REQUEST ID (32 bytes)
// =============================================================================

/// Opaque fixed-width request identifier.
///
/// Either derived from `(sender, nonce)` or from the full request tuple,
/// depending on the entry point. Globally unique among pending requests.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RequestId(pub Hash);

impl RequestId {
    /// Creates a request id from a hash.
    #[must_use]
    pub const fn new(hash: Hash) -> Self {
        Self(hash)
    }

    /// Creates a request id from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        Hash::from_slice(slice).map(Self)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Hash> for RequestId {
    fn from(hash: Hash) -> Self {
        Self(hash)
    }
}

// =============================================================================
// SERVICE ID (32 bytes)
// =============================================================================

/// Opaque identifier of the off-chain job/service being requested.
///
/// The broker never interprets it; it is relayed in the request event.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ServiceId(pub Hash);

impl ServiceId {
    /// Creates a service id from a hash.
    #[must_use]
    pub const fn new(hash: Hash) -> Self {
        Self(hash)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Hash> for ServiceId {
    fn from(hash: Hash) -> Self {
        Self(hash)
    }
}

// =============================================================================
// DATA VERSION (one byte)
// =============================================================================

/// Single-byte tag selecting how the opaque payload is interpreted
/// downstream. Not validated beyond its width.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize)]
pub struct DataVersion(u8);

impl DataVersion {
    /// Creates a data version from a byte.
    #[must_use]
    pub const fn new(version: u8) -> Self {
        Self(version)
    }

    /// Creates a data version from a wider integer. Returns None if the
    /// value does not fit in one byte.
    #[must_use]
    pub fn from_u64(raw: u64) -> Option<Self> {
        u8::try_from(raw).ok().map(Self)
    }

    /// Returns the raw byte.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

// =============================================================================
// COMPUTE BUDGET
// =============================================================================

/// Tracks compute consumption during an untrusted callback invocation.
///
/// ## Invariants
/// - `used <= limit` at all times
/// - Consumption that would exceed the limit is refused
#[derive(Clone, Copy, Debug, Default)]
pub struct ComputeBudget {
    /// Compute ceiling for this invocation.
    limit: u64,
    /// Compute consumed so far.
    used: u64,
}

impl ComputeBudget {
    /// Creates a new budget with the given ceiling.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Returns the ceiling.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns compute used so far.
    #[must_use]
    pub const fn used(&self) -> u64 {
        self.used
    }

    /// Returns remaining budget.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Consumes budget. Returns false if the ceiling would be exceeded.
    pub fn consume(&mut self, amount: u64) -> bool {
        if self.used.saturating_add(amount) > self.limit {
            false
        } else {
            self.used = self.used.saturating_add(amount);
            true
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
