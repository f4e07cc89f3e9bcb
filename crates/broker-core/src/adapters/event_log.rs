//! # In-Memory Event Log
//!
//! Append-only event sink retaining everything published, for assertions and
//! local inspection.

use crate::events::BrokerEvent;
use crate::ports::outbound::EventSink;
use std::sync::RwLock;

/// Event sink that retains every published event in order.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<BrokerEvent>>,
}

impl InMemoryEventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events published so far.
    #[must_use]
    pub fn events(&self) -> Vec<BrokerEvent> {
        self.events
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of events published so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for InMemoryEventLog {
    fn publish(&self, event: BrokerEvent) {
        self.events
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
