//! # Commitment Store
//!
//! Content-addressed map from request identifier to commitment hash.
//!
//! The entry's existence IS the pending request: deletion on settlement is
//! what enforces at-most-once fulfillment, and after the fact there is no
//! way to distinguish "fulfilled" from "cancelled" from "never existed".
//! This information loss is deliberate.

use crate::domain::value_objects::RequestId;
use crate::errors::BrokerError;
use broker_types::Hash;
use std::collections::HashMap;

/// Pending-request commitments, keyed by request id.
#[derive(Debug, Default, Clone)]
pub struct CommitmentStore {
    pending: HashMap<RequestId, Hash>,
}

impl CommitmentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a live commitment exists for the id.
    #[must_use]
    pub fn contains(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Inserts a commitment for a new request id.
    ///
    /// Rejects replay: a currently-pending request with the same id may not
    /// be overwritten.
    pub fn insert_new(&mut self, id: RequestId, commitment: Hash) -> Result<(), BrokerError> {
        if self.pending.contains_key(&id) {
            return Err(BrokerError::DuplicateRequest(id));
        }
        self.pending.insert(id, commitment);
        Ok(())
    }

    /// Returns true if the stored commitment for `id` equals `commitment`.
    #[must_use]
    pub fn matches(&self, id: RequestId, commitment: &Hash) -> bool {
        self.pending.get(&id) == Some(commitment)
    }

    /// Deletes the commitment for `id` if it matches `commitment`.
    ///
    /// A miss means the request is unknown, already settled, or the caller
    /// supplied tampered parameters; these are indistinguishable by design.
    pub fn take_matching(&mut self, id: RequestId, commitment: &Hash) -> Result<(), BrokerError> {
        if !self.matches(id, commitment) {
            return Err(BrokerError::UnknownRequest(id));
        }
        self.pending.remove(&id);
        Ok(())
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no requests are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
