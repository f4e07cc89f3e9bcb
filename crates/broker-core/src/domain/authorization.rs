//! # Authorization
//!
//! The set of identities permitted to fulfill requests. Replaced wholesale
//! on each update; an explicit clear to empty is rejected, so the set is
//! never observably empty once it has been non-empty.

use crate::errors::BrokerError;
use broker_types::Address;
use std::collections::BTreeSet;

/// The authorized-sender set gating fulfillment.
#[derive(Debug, Default, Clone)]
pub struct AuthorizedSenderSet {
    members: BTreeSet<Address>,
}

impl AuthorizedSenderSet {
    /// Creates an empty set (the broker's initial state).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure membership query.
    #[must_use]
    pub fn is_authorized(&self, sender: Address) -> bool {
        self.members.contains(&sender)
    }

    /// Replaces the set atomically. Duplicates collapse; an empty
    /// replacement is rejected.
    pub fn replace(&mut self, senders: Vec<Address>) -> Result<(), BrokerError> {
        if senders.is_empty() {
            return Err(BrokerError::EmptySenderSet);
        }
        self.members = senders.into_iter().collect();
        Ok(())
    }

    /// Current members in deterministic order (for the changed-event).
    #[must_use]
    pub fn members(&self) -> Vec<Address> {
        self.members.iter().copied().collect()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true before the first replacement.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
