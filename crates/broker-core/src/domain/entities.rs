//! # Domain Entities
//!
//! Core entities of the request/fulfillment protocol.

use crate::domain::services::commitment_hash;
use crate::domain::value_objects::{DataVersion, Nonce, RequestId, ServiceId};
use broker_types::{Address, Bytes, Hash, Payment, Selector};
use serde::{Deserialize, Serialize};

/// A fully-validated oracle request, as observable in the request event.
///
/// The broker does not persist this record; only the commitment hash
/// survives until settlement. Off-chain nodes reconstruct it from the event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    /// Unique identifier among pending requests.
    pub request_id: RequestId,
    /// Identity that funded the request and owns its callback.
    pub requester: Address,
    /// Escrowed amount, fixed at creation.
    pub payment: Payment,
    /// Off-chain job/service identifier (never interpreted here).
    pub service_id: ServiceId,
    /// Where to deliver the response.
    pub callback_address: Address,
    /// How to deliver the response.
    pub callback_selector: Selector,
    /// Absolute time after which the requester may cancel.
    pub expiration: u64,
    /// Requester-side nonce the id was derived from.
    pub nonce: Nonce,
    /// Payload interpretation tag (one byte).
    pub data_version: DataVersion,
    /// Opaque request parameters, relayed uninterpreted.
    pub payload: Bytes,
}

impl OracleRequest {
    /// The commitment binding this request's immutable parameters.
    #[must_use]
    pub fn commitment(&self) -> Hash {
        commitment_hash(
            self.payment,
            self.callback_address,
            self.callback_selector,
            self.expiration,
        )
    }
}

/// Parameters a node supplies with a fulfillment attempt.
///
/// Every field except `request_id` feeds the commitment recomputation; the
/// stored hash authenticates them without a per-request record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentParams {
    /// The request being fulfilled.
    pub request_id: RequestId,
    /// Escrowed amount, as fixed at creation.
    pub payment: Payment,
    /// Callback target from the original request.
    pub callback_address: Address,
    /// Callback selector from the original request.
    pub callback_selector: Selector,
    /// Expiration from the original request.
    pub expiration: u64,
}

impl FulfillmentParams {
    /// Recomputes the commitment from the supplied parameters.
    #[must_use]
    pub fn commitment(&self) -> Hash {
        commitment_hash(
            self.payment,
            self.callback_address,
            self.callback_selector,
            self.expiration,
        )
    }
}
