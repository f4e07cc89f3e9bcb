//! # Domain Layer
//!
//! Entities, value objects, invariants, and pure derivation services for the
//! request/fulfillment escrow protocol.

pub mod authorization;
pub mod commitment_store;
pub mod entities;
pub mod funds_ledger;
pub mod invariants;
pub mod services;
pub mod value_objects;
