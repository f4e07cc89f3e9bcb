//! # Shared Types Crate
//!
//! Value objects shared across the broker crates: fixed-width identities,
//! opaque byte payloads, and the Keccak-256 helper used for request ids and
//! commitments.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-crate primitives are defined here.
//! - **Value semantics**: every type is defined by its bytes, not identity.
//! - **No interpretation**: `Bytes` payloads are carried opaquely; parsing
//!   belongs to the crate that owns the wire format.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hashing;
pub mod values;

pub use hashing::{keccak256, keccak256_concat};
pub use values::{Address, Bytes, Hash, Payment, Selector};
