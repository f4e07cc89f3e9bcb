//! # Domain Invariants
//!
//! Business rules for request settlement, checked as free functions so the
//! service layer reads as a sequence of named rules.

use crate::domain::funds_ledger::FundsLedger;
use crate::domain::value_objects::RequestId;
use crate::errors::BrokerError;
use broker_types::Hash;

/// One logical word of a response payload, in bytes.
pub const WORD_BYTES: usize = 32;

/// Invariant: cancellation only at or after the request's expiration.
pub fn invariant_expiration_reached(now: u64, expiration: u64) -> Result<(), BrokerError> {
    if now < expiration {
        return Err(BrokerError::NotYetExpired { now, expiration });
    }
    Ok(())
}

/// Invariant: a multi-word response is strictly larger than one word.
///
/// Rejects degenerate empty/short payloads that would leave no data after
/// the echoed request id.
pub fn invariant_response_shape(response: &[u8]) -> Result<(), BrokerError> {
    if response.len() <= WORD_BYTES {
        return Err(BrokerError::ResponseTooShort {
            len: response.len(),
            min: WORD_BYTES + 1,
        });
    }
    Ok(())
}

/// Invariant: the request id embedded in a multi-word response is bound to
/// the id the top-level call targets.
///
/// The embedded id is read at the fixed, deterministic offset 0 of the
/// response bytes; no attacker-supplied offset field participates. This
/// closes the spoofing vector where shifted internal offsets make the broker
/// validate one id while the callback consumes data for another.
pub fn invariant_embedded_id_bound(
    request_id: RequestId,
    response: &[u8],
) -> Result<(), BrokerError> {
    let word = response
        .get(..WORD_BYTES)
        .and_then(Hash::from_slice)
        .ok_or(BrokerError::ResponseTooShort {
            len: response.len(),
            min: WORD_BYTES + 1,
        })?;
    let embedded = RequestId::new(word);
    if embedded != request_id {
        return Err(BrokerError::EmbeddedIdMismatch {
            embedded,
            expected: request_id,
        });
    }
    Ok(())
}

/// Invariant: escrow conservation.
///
/// `total_held == total_committed + Σ payouts + free_pool` at all times;
/// the withdrawable pool is never negative.
#[must_use]
pub fn invariant_escrow_conserved(ledger: &FundsLedger) -> bool {
    ledger.is_conserved()
}
