//! # Driven Ports (Outbound)
//!
//! Interfaces the broker depends on. Adapters implement these traits to
//! provide the payment asset, callback delivery, time, and event publishing.
//! Dependencies point inward: the service never names an adapter type.

use crate::domain::value_objects::{ComputeBudget, RequestId};
use crate::errors::AssetError;
use crate::events::BrokerEvent;
use async_trait::async_trait;
use broker_types::{Address, Bytes, Payment, Selector};

// =============================================================================
// PAYMENT ASSET
// =============================================================================

/// Interface to the external fungible payment asset.
///
/// The broker only ever moves asset out of its own custody; inbound asset
/// arrives through the asset's transfer-with-notification primitive, which
/// invokes the broker's intake entry point.
///
/// Implementations must not call back into the broker: `transfer` is awaited
/// while the broker's state lock is held, so a re-entrant implementation
/// deadlocks rather than observing partial state.
#[async_trait]
pub trait PaymentAsset: Send + Sync {
    /// Transfers `amount` from the broker's custody to `to`.
    async fn transfer(&self, to: Address, amount: Payment) -> Result<(), AssetError>;

    /// Asset balance of an account.
    async fn balance_of(&self, who: Address) -> Payment;
}

// =============================================================================
// CALLBACK INVOKER
// =============================================================================

/// Outcome of an untrusted callback invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Callback completed within its budget.
    Delivered {
        /// Compute consumed.
        compute_used: u64,
    },
    /// Callback aborted itself.
    Reverted {
        /// Reason supplied by the target, if any.
        reason: String,
    },
    /// Callback exceeded the pre-committed compute budget.
    BudgetExhausted {
        /// The ceiling that was exceeded.
        budget: u64,
    },
}

impl CallbackOutcome {
    /// Whether delivery completed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Capability-scoped invocation of the requester's callback.
///
/// The invoker MUST confine the target to the supplied budget: exceeding it
/// aborts only the callback's effects, never the fulfillment that triggered
/// it. Implementations must not panic on hostile targets.
#[async_trait]
pub trait CallbackInvoker: Send + Sync {
    /// Invokes `target.selector(request_id, data)` under `budget`.
    async fn invoke(
        &self,
        target: Address,
        selector: Selector,
        request_id: RequestId,
        data: Bytes,
        budget: ComputeBudget,
    ) -> CallbackOutcome;
}

// =============================================================================
// TIME SOURCE
// =============================================================================

/// Supplies the current time (unix seconds) for expiration assignment and
/// cancellation checks. Explicit so tests can drive the clock.
pub trait TimeSource: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> u64;
}

// =============================================================================
// EVENT SINK
// =============================================================================

/// Append-only destination for externally observable events.
pub trait EventSink: Send + Sync {
    /// Publishes one event. Must not fail; the broker's state transitions
    /// do not depend on observers.
    fn publish(&self, event: BrokerEvent);
}

// =============================================================================
// TESTS
// =============================================================================
