//! # Domain Services
//!
//! Pure derivation functions: request-identifier hashing and commitment
//! hashing. These are the correctness-critical operations of the protocol;
//! both fulfillment and cancellation authenticate their parameters by
//! recomputing these hashes and comparing against stored state.

use crate::domain::value_objects::{DataVersion, Nonce, RequestId, ServiceId};
use broker_types::{keccak256_concat, Address, Hash, Payment, Selector};

/// Derives a request id from `(requester, nonce)`.
///
/// Used by the `oracle_request` entry point and by nonce-based cancellation.
#[must_use]
pub fn request_id_from_nonce(requester: Address, nonce: Nonce) -> RequestId {
    RequestId::new(keccak256_concat(&[
        requester.as_bytes(),
        &nonce.to_be_bytes(),
    ]))
}

/// Derives a request id from the full request tuple.
///
/// Used by the `operator_request` entry point.
#[must_use]
pub fn request_id_from_tuple(
    requester: Address,
    payment: Payment,
    service_id: ServiceId,
    callback_address: Address,
    callback_selector: Selector,
    nonce: Nonce,
    data_version: DataVersion,
) -> RequestId {
    RequestId::new(keccak256_concat(&[
        requester.as_bytes(),
        &payment.to_be_bytes(),
        service_id.as_bytes(),
        callback_address.as_bytes(),
        callback_selector.as_bytes(),
        &nonce.to_be_bytes(),
        &[data_version.get()],
    ]))
}

/// Computes the commitment binding a request's immutable parameters.
///
/// Existence of this hash under a request id IS the pending request; there
/// is no separate status field. Tampering with any parameter changes the
/// hash and fails the match.
#[must_use]
pub fn commitment_hash(
    payment: Payment,
    callback_address: Address,
    callback_selector: Selector,
    expiration: u64,
) -> Hash {
    keccak256_concat(&[
        &payment.to_be_bytes(),
        callback_address.as_bytes(),
        callback_selector.as_bytes(),
        &expiration.to_be_bytes(),
    ])
}
