//! # Error Types
//!
//! All error types for the broker protocol. Every failure is a synchronous,
//! all-or-nothing rejection of the operation that raised it; no partial state
//! mutation survives a rejected operation.

use crate::domain::value_objects::RequestId;
use broker_types::{Address, Payment, Selector};
use thiserror::Error;

// =============================================================================
// WIRE ERRORS
// =============================================================================

/// Errors from decoding the token-transfer notification payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Notification data shorter than the fixed-field minimum.
    #[error("notification data too short: {len} < {min} bytes")]
    TooShort { len: usize, min: usize },

    /// Selector does not name a known request entry point.
    #[error("unknown request selector: {0:?}")]
    UnknownSelector(Selector),

    /// Data past the selector is not a whole number of words.
    #[error("notification data not word-aligned: {len} bytes past selector")]
    Misaligned { len: usize },

    /// Exactly one tail word: neither "no payload" (0) nor a
    /// length-prefixed payload (>= 2).
    #[error("degenerate payload tail: exactly one extra word")]
    DegenerateTail,

    /// Declared payload length does not fit the tail word count.
    #[error("payload length {declared} does not fit {words} tail words")]
    PayloadLengthMismatch { declared: usize, words: usize },

    /// Data version does not fit in one byte.
    #[error("data version out of range: {0} > 255")]
    DataVersionOverflow(u64),

    /// A fixed-width field was carried with non-zero padding bytes.
    #[error("non-canonical word encoding for {field}")]
    NonCanonicalWord { field: &'static str },
}

// =============================================================================
// LEDGER ERRORS
// =============================================================================

/// Errors from funds-ledger accounting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Arithmetic overflow on a balance update.
    #[error("ledger arithmetic overflow")]
    Overflow,

    /// Attempted to release more than is currently committed.
    #[error("release exceeds committed escrow: {requested} > {committed}")]
    ReleaseExceedsCommitted {
        requested: Payment,
        committed: Payment,
    },

    /// Withdrawal exceeding the uncommitted, unreserved pool.
    #[error("insufficient withdrawable balance: {requested} > {available}")]
    InsufficientWithdrawable {
        requested: Payment,
        available: Payment,
    },

    /// Payout withdrawal exceeding the identity's credited balance.
    #[error("insufficient payout balance: {requested} > {available}")]
    InsufficientPayout {
        requested: Payment,
        available: Payment,
    },
}

// =============================================================================
// ASSET ERRORS
// =============================================================================

/// Errors from the external payment asset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// Transfer exceeding the holder's asset balance.
    #[error("asset transfer failed: {requested} > {available}")]
    InsufficientFunds {
        requested: Payment,
        available: Payment,
    },
}

// =============================================================================
// BROKER ERRORS
// =============================================================================

/// Errors surfaced by the broker's public operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Malformed notification payload.
    #[error("malformed notification: {0}")]
    Wire(#[from] WireError),

    /// Funds accounting failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Payment asset failure.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Notification did not originate from the configured payment asset.
    #[error("untrusted notifier: {0:?}")]
    UntrustedNotifier(Address),

    /// Notification arrived while a prior notification was being processed.
    #[error("re-entrant token notification")]
    ReentrantNotification,

    /// Encoded payment field differs from the amount actually transferred.
    #[error("payment mismatch: claimed {claimed}, transferred {transferred}")]
    PaymentMismatch {
        claimed: Payment,
        transferred: Payment,
    },

    /// Encoded sender field differs from the authenticated transfer sender.
    #[error("sender mismatch: encoded {encoded:?}, actual {actual:?}")]
    SenderMismatch { encoded: Address, actual: Address },

    /// A live commitment already exists for this request id.
    #[error("request id already pending: {0}")]
    DuplicateRequest(RequestId),

    /// No live commitment matches the id and parameters.
    #[error("unknown or already-settled request: {0}")]
    UnknownRequest(RequestId),

    /// Caller is not in the authorized-sender set.
    #[error("unauthorized sender: {0:?}")]
    NotAuthorized(Address),

    /// Operation restricted to the administrator.
    #[error("administrator only")]
    AdminOnly,

    /// Replacement authorized-sender set was empty.
    #[error("must have at least one authorized sender")]
    EmptySenderSet,

    /// Cancellation attempted before the request's expiration.
    #[error("not yet expired: now {now} < expiration {expiration}")]
    NotYetExpired { now: u64, expiration: u64 },

    /// Multi-word response not strictly larger than one word.
    #[error("response too short: {len} <= {min} bytes")]
    ResponseTooShort { len: usize, min: usize },

    /// Embedded request id does not match the id the call targets.
    #[error("embedded request id mismatch: embedded {embedded}, expected {expected}")]
    EmbeddedIdMismatch {
        embedded: RequestId,
        expected: RequestId,
    },
}

impl BrokerError {
    /// Returns true for authorization failures (unauthorized fulfiller,
    /// non-administrator on administrative operations).
    #[must_use]
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Self::NotAuthorized(_) | Self::AdminOnly)
    }

    /// Returns true for state-consistency failures (commitment mismatch,
    /// double settlement, replayed ids).
    #[must_use]
    pub fn is_state_consistency_failure(&self) -> bool {
        matches!(self, Self::DuplicateRequest(_) | Self::UnknownRequest(_))
    }

    /// Returns true for malformed-input failures rejected before any state
    /// is touched.
    #[must_use]
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::Wire(_)
                | Self::PaymentMismatch { .. }
                | Self::SenderMismatch { .. }
                | Self::ResponseTooShort { .. }
                | Self::EmbeddedIdMismatch { .. }
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
