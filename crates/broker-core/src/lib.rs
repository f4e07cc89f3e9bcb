//! # Broker Core - Oracle Request/Fulfillment Escrow
//!
//! Escrow broker between requesters who pay for off-chain work and the
//! authorized nodes that deliver it. Requests arrive through the payment
//! asset's transfer-with-notification hook, are held as commitment hashes,
//! and are settled exactly once by fulfillment or post-expiration
//! cancellation.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Commitment presence IS the pending request | `domain/commitment_store.rs` - `take_matching()` |
//! | At-most-once settlement | `domain/commitment_store.rs` - deletion on settle |
//! | Escrow conservation (`held == committed + payouts + free`) | `domain/funds_ledger.rs` - `is_conserved()` |
//! | Payment binds claimed amount to transferred amount | `service.rs` - `accept_request()` |
//! | Cancellation only at/after expiration | `domain/invariants.rs` - `invariant_expiration_reached()` |
//! | Multi-word response exceeds one word | `domain/invariants.rs` - `invariant_response_shape()` |
//! | Embedded response id bound at fixed offset | `domain/invariants.rs` - `invariant_embedded_id_bound()` |
//!
//! ## Security
//!
//! - **Trusted notifier only**: intake rejects notifications not originating
//!   from the configured payment asset
//! - **Checks-effects-interactions**: commitments are deleted and payment
//!   released before the untrusted callback runs, outside the state lock
//! - **Budgeted callbacks**: consumer code runs under a compute ceiling; its
//!   failure never claws back the node's payment
//!
//! ## Usage Example
//!
//! ```ignore
//! use broker_core::prelude::*;
//!
//! let broker = OracleBroker::new(config, asset, callbacks, clock, events);
//!
//! // Requester escrows payment; the asset adapter calls the hook.
//! let request_id = broker
//!     .on_token_transfer(token, requester, payment, command_bytes)
//!     .await?;
//!
//! // An authorized node fulfills against the stored commitment.
//! let delivered = broker.fulfill_request(node, params, response).await?;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;
pub mod service;
pub mod wire;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{FulfillmentParams, OracleRequest};

    // Value objects
    pub use crate::domain::value_objects::{
        ComputeBudget, DataVersion, Nonce, RequestId, ServiceId,
    };

    // Domain services
    pub use crate::domain::services::{
        commitment_hash, request_id_from_nonce, request_id_from_tuple,
    };

    // Invariants
    pub use crate::domain::invariants::{
        invariant_embedded_id_bound, invariant_escrow_conserved, invariant_expiration_reached,
        invariant_response_shape, WORD_BYTES,
    };

    // Ports
    pub use crate::ports::inbound::BrokerApi;
    pub use crate::ports::outbound::{
        CallbackInvoker, CallbackOutcome, EventSink, PaymentAsset, TimeSource,
    };

    // Events
    pub use crate::events::{
        AuthorizedSendersChangedEvent, BrokerEvent, RequestCancelledEvent, RequestCreatedEvent,
        ResponseAcceptedEvent, ResponseDeliveredEvent,
    };

    // Errors
    pub use crate::errors::{AssetError, BrokerError, LedgerError, WireError};

    // Wire codec
    pub use crate::wire::{selectors, RequestCommand, RequestEntry, MIN_COMMAND_LEN};

    // Adapters
    pub use crate::adapters::{
        ConsumerBehavior, InMemoryAsset, InMemoryEventLog, ManualClock, MeteredCallback,
        RecordedInvocation, SystemClock,
    };

    // Service
    pub use crate::service::{BrokerConfig, BrokerStats, OracleBroker};

    // Shared primitives
    pub use broker_types::{Address, Bytes, Hash, Payment, Selector};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
