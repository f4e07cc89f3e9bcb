//! # Driving Ports (Inbound)
//!
//! The broker's public operation surface. Every operation is atomic: a
//! rejection leaves no partial state mutation behind.

use crate::domain::entities::FulfillmentParams;
use crate::domain::value_objects::{Nonce, RequestId};
use crate::errors::BrokerError;
use async_trait::async_trait;
use broker_types::{Address, Bytes, Hash, Payment, Selector};

/// The broker's public API.
///
/// ## Identity
///
/// Callers are identified by the explicit `caller`/`sender` arguments; the
/// surrounding transport is responsible for authenticating them before
/// invoking this trait.
#[async_trait]
pub trait BrokerApi: Send + Sync {
    /// Intake entry point, invoked by the payment asset's
    /// transfer-with-notification primitive.
    ///
    /// `notifier` must be the configured payment asset identity; `amount` is
    /// the asset actually transferred in the same atomic operation. Empty
    /// `data` is a plain deposit into the withdrawable pool; otherwise the
    /// data must decode to a request command whose claimed sender and
    /// payment match the authenticated values.
    ///
    /// Returns the new request id, or `None` for a plain deposit.
    async fn on_token_transfer(
        &self,
        notifier: Address,
        sender: Address,
        amount: Payment,
        data: Bytes,
    ) -> Result<Option<RequestId>, BrokerError>;

    /// Fulfills a request with a single-word response.
    ///
    /// Caller must be an authorized sender; the recomputed commitment must
    /// match. Payment is released to the caller unconditionally once
    /// verification passes; the returned flag reports only whether the
    /// callback completed within its budget.
    async fn fulfill_request(
        &self,
        caller: Address,
        params: FulfillmentParams,
        response: Hash,
    ) -> Result<bool, BrokerError>;

    /// Fulfills a request with a multi-word response.
    ///
    /// Same semantics as [`Self::fulfill_request`], plus: the response must
    /// be strictly larger than one word, and its first word must equal the
    /// `request_id` this call targets.
    async fn fulfill_request_bytes(
        &self,
        caller: Address,
        params: FulfillmentParams,
        response: Bytes,
    ) -> Result<bool, BrokerError>;

    /// Cancels an expired, unfulfilled request.
    ///
    /// Callable by anyone at or after `expiration`; the commitment is
    /// recomputed with the caller as the requester, so only the true
    /// requester tuple matches. Refunds the requester's payout balance.
    async fn cancel_request(
        &self,
        caller: Address,
        request_id: RequestId,
        payment: Payment,
        callback_selector: Selector,
        expiration: u64,
    ) -> Result<(), BrokerError>;

    /// Cancels via `(requester, nonce)` for requesters who tracked nonces
    /// rather than ids. Refunds `requester`, never the caller.
    async fn cancel_request_by_requester_nonce(
        &self,
        caller: Address,
        requester: Address,
        nonce: Nonce,
        payment: Payment,
        callback_selector: Selector,
        expiration: u64,
    ) -> Result<(), BrokerError>;

    /// Replaces the authorized-sender set.
    ///
    /// Callable by the administrator or any current member. Rejects an
    /// empty replacement.
    async fn set_authorized_senders(
        &self,
        caller: Address,
        senders: Vec<Address>,
    ) -> Result<(), BrokerError>;

    /// Pure membership query.
    async fn is_authorized_sender(&self, sender: Address) -> bool;

    /// Administrator withdrawal from the uncommitted, unreserved pool.
    /// Also the recovery path for asset sent outside the escrow flow.
    async fn withdraw(
        &self,
        caller: Address,
        to: Address,
        amount: Payment,
    ) -> Result<(), BrokerError>;

    /// Withdraws from the caller's credited payout balance (node earnings,
    /// cancellation refunds).
    async fn withdraw_payout(
        &self,
        caller: Address,
        to: Address,
        amount: Payment,
    ) -> Result<(), BrokerError>;

    /// Uncommitted, unreserved asset available to [`Self::withdraw`].
    async fn withdrawable(&self) -> Payment;

    /// Credited payout balance of an identity.
    async fn balance_of(&self, who: Address) -> Payment;

    /// Diagnostics: does a live commitment exist for this id?
    async fn commitment_exists(&self, request_id: RequestId) -> bool;

    /// Diagnostics: number of pending requests.
    async fn pending_count(&self) -> usize;
}
