//! # Event Schema
//!
//! Externally observable, append-only events. The request event is the sole
//! channel by which off-chain nodes learn of new work; the delivery event is
//! how requesters learn outcomes. Events are emitted after the state
//! mutations they describe and are never retracted.

use crate::domain::value_objects::{DataVersion, RequestId, ServiceId};
use broker_types::{Address, Bytes, Payment, Selector};
use serde::{Deserialize, Serialize};

/// A new request was validated and escrowed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCreatedEvent {
    /// Off-chain service identifier, uninterpreted.
    pub service_id: ServiceId,
    /// Identity that funded the request.
    pub requester: Address,
    /// Identifier nodes must echo when fulfilling.
    pub request_id: RequestId,
    /// Escrowed amount.
    pub payment: Payment,
    /// Response delivery target.
    pub callback_address: Address,
    /// Response delivery selector.
    pub callback_selector: Selector,
    /// Absolute cancellation deadline.
    pub expiration: u64,
    /// Payload interpretation tag.
    pub data_version: DataVersion,
    /// Opaque request parameters.
    pub payload: Bytes,
}

/// A fulfillment attempt passed verification; the commitment is gone and
/// payment is released. Emitted before the callback is attempted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseAcceptedEvent {
    /// The settled request.
    pub request_id: RequestId,
    /// The node credited with the payment.
    pub node: Address,
}

/// Delivery outcome of the callback attempt. Payment was released either
/// way; `callback_succeeded` is informational for the requester.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDeliveredEvent {
    /// The settled request.
    pub request_id: RequestId,
    /// Whether the callback completed within its compute budget.
    pub callback_succeeded: bool,
}

/// An unfulfilled request was cancelled after its expiration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelledEvent {
    /// The cancelled request.
    pub request_id: RequestId,
}

/// The authorized-sender set was replaced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedSendersChangedEvent {
    /// The full new set, in deterministic order.
    pub senders: Vec<Address>,
    /// Who performed the replacement (administrator or a prior member).
    pub changed_by: Address,
}

/// All externally observable broker events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerEvent {
    /// New request escrowed.
    RequestCreated(RequestCreatedEvent),
    /// Fulfillment verified, payment released.
    ResponseAccepted(ResponseAcceptedEvent),
    /// Callback delivery outcome.
    ResponseDelivered(ResponseDeliveredEvent),
    /// Request cancelled and refunded.
    RequestCancelled(RequestCancelledEvent),
    /// Authorized-sender set replaced.
    AuthorizedSendersChanged(AuthorizedSendersChangedEvent),
}
