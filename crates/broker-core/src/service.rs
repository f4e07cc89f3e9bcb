//! # Oracle Broker Service
//!
//! The broker coordinating request escrow, fulfillment, and cancellation.
//!
//! ## Settlement discipline
//!
//! Fulfillment is checks-effects-interactions: the commitment is deleted and
//! the payment released under the state lock, BEFORE the untrusted callback
//! runs outside it. A hostile callback re-entering the broker therefore finds
//! the request already settled.
//!
//! ## Security
//!
//! - Intake accepts notifications only from the configured payment asset
//! - Encoded `sender`/`payment` fields are validated against the
//!   authenticated transfer values before any state is touched
//! - Fulfillment is gated on the authorized-sender set

use crate::domain::authorization::AuthorizedSenderSet;
use crate::domain::commitment_store::CommitmentStore;
use crate::domain::entities::{FulfillmentParams, OracleRequest};
use crate::domain::funds_ledger::FundsLedger;
use crate::domain::invariants::{
    invariant_embedded_id_bound, invariant_expiration_reached, invariant_response_shape,
};
use crate::domain::services::{commitment_hash, request_id_from_nonce, request_id_from_tuple};
use crate::domain::value_objects::{ComputeBudget, Nonce, RequestId};
use crate::errors::{BrokerError, LedgerError};
use crate::events::{
    AuthorizedSendersChangedEvent, BrokerEvent, RequestCancelledEvent, RequestCreatedEvent,
    ResponseAcceptedEvent, ResponseDeliveredEvent,
};
use crate::ports::inbound::BrokerApi;
use crate::ports::outbound::{CallbackInvoker, EventSink, PaymentAsset, TimeSource};
use crate::wire::{RequestCommand, RequestEntry};

use async_trait::async_trait;
use broker_types::{Address, Bytes, Hash, Payment, Selector};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Broker configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Administrator identity (free-pool withdrawal, sender-set bootstrap).
    pub admin: Address,
    /// The payment asset whose transfer notifications are trusted.
    pub payment_token: Address,
    /// Compute ceiling per callback invocation.
    pub callback_budget: u64,
    /// Seconds from acceptance to a request's cancellation deadline.
    pub request_expiry_secs: u64,
}

impl BrokerConfig {
    /// Creates a configuration with default budget and expiry.
    #[must_use]
    pub fn new(admin: Address, payment_token: Address) -> Self {
        Self {
            admin,
            payment_token,
            callback_budget: 400_000,
            request_expiry_secs: 300, // 5 minutes
        }
    }
}

/// Statistics for the broker service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BrokerStats {
    /// Requests validated and escrowed.
    pub requests_accepted: u64,
    /// Notifications with empty data (deposits into the free pool).
    pub plain_deposits: u64,
    /// Fulfillments that passed verification (payment released).
    pub fulfillments: u64,
    /// Fulfillments whose callback reverted or exhausted its budget.
    pub failed_deliveries: u64,
    /// Requests cancelled and refunded.
    pub cancellations: u64,
    /// Operations rejected without state mutation.
    pub rejected_operations: u64,
}

/// Mutable broker state, guarded by one lock so every operation observes a
/// consistent commitment/ledger/authorization snapshot.
#[derive(Debug, Default)]
struct BrokerState {
    commitments: CommitmentStore,
    ledger: FundsLedger,
    authorized: AuthorizedSenderSet,
    /// Set while a notification is being decoded and escrowed. Intake holds
    /// the write lock for that whole window, so the lock is what serializes
    /// notifiers; a nested intake that reaches the state mid-window reads
    /// this flag and is rejected as re-entrant instead of waiting.
    in_notification: bool,
    stats: BrokerStats,
}

/// The oracle request/fulfillment broker.
///
/// This service:
/// 1. Accepts escrowed requests through the payment asset's notification hook
/// 2. Verifies fulfillments against stored commitments and pays nodes
/// 3. Delivers responses to requester callbacks under a compute budget
/// 4. Refunds expired, unfulfilled requests on cancellation
pub struct OracleBroker {
    /// Broker configuration.
    config: BrokerConfig,
    /// External payment asset.
    asset: Arc<dyn PaymentAsset>,
    /// Callback delivery.
    callbacks: Arc<dyn CallbackInvoker>,
    /// Time source for expiration assignment and cancellation checks.
    clock: Arc<dyn TimeSource>,
    /// Event publication.
    events: Arc<dyn EventSink>,
    /// Guarded state.
    state: Arc<RwLock<BrokerState>>,
}

impl OracleBroker {
    /// Creates a new broker.
    pub fn new(
        config: BrokerConfig,
        asset: Arc<dyn PaymentAsset>,
        callbacks: Arc<dyn CallbackInvoker>,
        clock: Arc<dyn TimeSource>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            asset,
            callbacks,
            clock,
            events,
            state: Arc::new(RwLock::new(BrokerState::default())),
        }
    }

    /// The broker's configuration.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Current service statistics.
    pub async fn stats(&self) -> BrokerStats {
        self.state.read().await.stats.clone()
    }

    /// Forces the notification-in-progress flag, to exercise the re-entrancy
    /// rejection from tests. Production intake never releases the state lock
    /// between setting and clearing the flag, so the rejection is only
    /// observable by pinning the flag here.
    #[cfg(test)]
    pub(crate) async fn force_notification_flag(&self, value: bool) {
        self.state.write().await.in_notification = value;
    }

    /// Validates an intake notification and escrows the request.
    ///
    /// Runs entirely under the state lock; any error leaves the commitment
    /// store and ledger untouched.
    fn accept_request(
        state: &mut BrokerState,
        sender: Address,
        amount: Payment,
        data: &[u8],
        expiration: u64,
    ) -> Result<OracleRequest, BrokerError> {
        let command = RequestCommand::decode(data)?;
        if command.sender != sender {
            return Err(BrokerError::SenderMismatch {
                encoded: command.sender,
                actual: sender,
            });
        }
        if command.payment != amount {
            return Err(BrokerError::PaymentMismatch {
                claimed: command.payment,
                transferred: amount,
            });
        }

        let request_id = match command.entry {
            RequestEntry::Oracle => request_id_from_nonce(command.sender, command.nonce),
            RequestEntry::Operator => request_id_from_tuple(
                command.sender,
                command.payment,
                command.service_id,
                command.callback_address,
                command.callback_selector,
                command.nonce,
                command.data_version,
            ),
        };
        if state.commitments.contains(request_id) {
            return Err(BrokerError::DuplicateRequest(request_id));
        }

        let commitment = commitment_hash(
            command.payment,
            command.callback_address,
            command.callback_selector,
            expiration,
        );
        state.ledger.deposit_and_commit(amount)?;
        state.commitments.insert_new(request_id, commitment)?;

        Ok(OracleRequest {
            request_id,
            requester: command.sender,
            payment: command.payment,
            service_id: command.service_id,
            callback_address: command.callback_address,
            callback_selector: command.callback_selector,
            expiration,
            nonce: command.nonce,
            data_version: command.data_version,
            payload: command.payload,
        })
    }

    /// Verifies a fulfillment attempt and settles it: deletes the commitment
    /// and releases the payment to the caller. Runs under the state lock.
    fn settle_fulfillment(
        state: &mut BrokerState,
        caller: Address,
        params: &FulfillmentParams,
    ) -> Result<(), BrokerError> {
        if !state.authorized.is_authorized(caller) {
            return Err(BrokerError::NotAuthorized(caller));
        }
        state
            .commitments
            .take_matching(params.request_id, &params.commitment())?;
        state.ledger.release(params.payment, caller)?;
        state.stats.fulfillments += 1;
        Ok(())
    }

    /// Runs the settled request's callback outside the state lock, then
    /// records the outcome.
    async fn deliver_response(
        &self,
        caller: Address,
        params: &FulfillmentParams,
        data: Bytes,
    ) -> bool {
        self.events
            .publish(BrokerEvent::ResponseAccepted(ResponseAcceptedEvent {
                request_id: params.request_id,
                node: caller,
            }));

        let outcome = self
            .callbacks
            .invoke(
                params.callback_address,
                params.callback_selector,
                params.request_id,
                data,
                ComputeBudget::new(self.config.callback_budget),
            )
            .await;
        let callback_succeeded = outcome.succeeded();

        if callback_succeeded {
            debug!(request_id = %params.request_id, "Callback delivered");
        } else {
            // Payment stays released: delivery failure is the requester's
            // problem, not the node's.
            warn!(
                request_id = %params.request_id,
                outcome = ?outcome,
                "Callback failed; payment already released"
            );
            self.state.write().await.stats.failed_deliveries += 1;
        }

        self.events
            .publish(BrokerEvent::ResponseDelivered(ResponseDeliveredEvent {
                request_id: params.request_id,
                callback_succeeded,
            }));
        callback_succeeded
    }

    /// Verifies and settles a cancellation. Runs under the state lock.
    ///
    /// The commitment is recomputed with `requester` standing in as the
    /// callback address, which is how request creation bound it; only the
    /// true requester tuple can match.
    fn settle_cancellation(
        state: &mut BrokerState,
        now: u64,
        requester: Address,
        request_id: RequestId,
        payment: Payment,
        callback_selector: Selector,
        expiration: u64,
    ) -> Result<(), BrokerError> {
        invariant_expiration_reached(now, expiration)?;
        let commitment = commitment_hash(payment, requester, callback_selector, expiration);
        state.commitments.take_matching(request_id, &commitment)?;
        state.ledger.release(payment, requester)?;
        state.stats.cancellations += 1;
        Ok(())
    }
}

#[async_trait]
impl BrokerApi for OracleBroker {
    #[instrument(skip(self, data), fields(sender = %sender, amount = amount))]
    async fn on_token_transfer(
        &self,
        notifier: Address,
        sender: Address,
        amount: Payment,
        data: Bytes,
    ) -> Result<Option<RequestId>, BrokerError> {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        if notifier != self.config.payment_token {
            warn!(notifier = %notifier, "Notification from untrusted asset");
            state.stats.rejected_operations += 1;
            return Err(BrokerError::UntrustedNotifier(notifier));
        }
        if state.in_notification {
            warn!("Re-entrant token notification rejected");
            state.stats.rejected_operations += 1;
            return Err(BrokerError::ReentrantNotification);
        }

        // Empty data: a plain deposit into the free pool.
        if data.is_empty() {
            state.ledger.deposit(amount)?;
            state.stats.plain_deposits += 1;
            debug!("Plain deposit accepted");
            return Ok(None);
        }

        state.in_notification = true;
        let expiration = now.saturating_add(self.config.request_expiry_secs);
        let result = Self::accept_request(&mut state, sender, amount, data.as_slice(), expiration);
        state.in_notification = false;

        match result {
            Ok(request) => {
                state.stats.requests_accepted += 1;
                drop(state);
                info!(
                    request_id = %request.request_id,
                    payment = request.payment,
                    expiration = request.expiration,
                    "Request escrowed"
                );
                let request_id = request.request_id;
                self.events
                    .publish(BrokerEvent::RequestCreated(RequestCreatedEvent {
                        service_id: request.service_id,
                        requester: request.requester,
                        request_id,
                        payment: request.payment,
                        callback_address: request.callback_address,
                        callback_selector: request.callback_selector,
                        expiration: request.expiration,
                        data_version: request.data_version,
                        payload: request.payload,
                    }));
                Ok(Some(request_id))
            }
            Err(e) => {
                warn!(error = %e, "Request intake rejected");
                state.stats.rejected_operations += 1;
                Err(e)
            }
        }
    }

    #[instrument(skip(self, params), fields(request_id = %params.request_id, caller = %caller))]
    async fn fulfill_request(
        &self,
        caller: Address,
        params: FulfillmentParams,
        response: Hash,
    ) -> Result<bool, BrokerError> {
        {
            let mut state = self.state.write().await;
            if let Err(e) = Self::settle_fulfillment(&mut state, caller, &params) {
                warn!(error = %e, "Fulfillment rejected");
                state.stats.rejected_operations += 1;
                return Err(e);
            }
        }
        info!(payment = params.payment, "Fulfillment settled");

        let data = Bytes::from_slice(response.as_bytes());
        Ok(self.deliver_response(caller, &params, data).await)
    }

    #[instrument(skip(self, params, response), fields(request_id = %params.request_id, caller = %caller))]
    async fn fulfill_request_bytes(
        &self,
        caller: Address,
        params: FulfillmentParams,
        response: Bytes,
    ) -> Result<bool, BrokerError> {
        {
            let mut state = self.state.write().await;
            let verified = invariant_response_shape(response.as_slice())
                .and_then(|()| invariant_embedded_id_bound(params.request_id, response.as_slice()))
                .and_then(|()| Self::settle_fulfillment(&mut state, caller, &params));
            if let Err(e) = verified {
                warn!(error = %e, "Fulfillment rejected");
                state.stats.rejected_operations += 1;
                return Err(e);
            }
        }
        info!(
            payment = params.payment,
            response_len = response.len(),
            "Fulfillment settled"
        );

        Ok(self.deliver_response(caller, &params, response).await)
    }

    #[instrument(skip(self), fields(request_id = %request_id, caller = %caller))]
    async fn cancel_request(
        &self,
        caller: Address,
        request_id: RequestId,
        payment: Payment,
        callback_selector: Selector,
        expiration: u64,
    ) -> Result<(), BrokerError> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        if let Err(e) = Self::settle_cancellation(
            &mut state,
            now,
            caller,
            request_id,
            payment,
            callback_selector,
            expiration,
        ) {
            warn!(error = %e, "Cancellation rejected");
            state.stats.rejected_operations += 1;
            return Err(e);
        }
        drop(state);
        info!(payment = payment, "Request cancelled and refunded");
        self.events
            .publish(BrokerEvent::RequestCancelled(RequestCancelledEvent {
                request_id,
            }));
        Ok(())
    }

    #[instrument(skip(self), fields(requester = %requester, nonce = nonce, caller = %caller))]
    async fn cancel_request_by_requester_nonce(
        &self,
        caller: Address,
        requester: Address,
        nonce: Nonce,
        payment: Payment,
        callback_selector: Selector,
        expiration: u64,
    ) -> Result<(), BrokerError> {
        // Refund goes to the requester the id was derived from, never the
        // caller; a third party triggering this only does the requester a
        // favor.
        let request_id = request_id_from_nonce(requester, nonce);
        let now = self.clock.now();
        let mut state = self.state.write().await;
        if let Err(e) = Self::settle_cancellation(
            &mut state,
            now,
            requester,
            request_id,
            payment,
            callback_selector,
            expiration,
        ) {
            warn!(error = %e, "Cancellation rejected");
            state.stats.rejected_operations += 1;
            return Err(e);
        }
        drop(state);
        info!(payment = payment, "Request cancelled and refunded");
        self.events
            .publish(BrokerEvent::RequestCancelled(RequestCancelledEvent {
                request_id,
            }));
        Ok(())
    }

    #[instrument(skip(self, senders), fields(caller = %caller, count = senders.len()))]
    async fn set_authorized_senders(
        &self,
        caller: Address,
        senders: Vec<Address>,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.write().await;
        if caller != self.config.admin && !state.authorized.is_authorized(caller) {
            warn!("Sender-set replacement by unauthorized caller");
            state.stats.rejected_operations += 1;
            return Err(BrokerError::NotAuthorized(caller));
        }
        if let Err(e) = state.authorized.replace(senders) {
            state.stats.rejected_operations += 1;
            return Err(e);
        }
        let members = state.authorized.members();
        drop(state);
        info!(count = members.len(), "Authorized-sender set replaced");
        self.events.publish(BrokerEvent::AuthorizedSendersChanged(
            AuthorizedSendersChangedEvent {
                senders: members,
                changed_by: caller,
            },
        ));
        Ok(())
    }

    async fn is_authorized_sender(&self, sender: Address) -> bool {
        self.state.read().await.authorized.is_authorized(sender)
    }

    #[instrument(skip(self), fields(to = %to, amount = amount))]
    async fn withdraw(
        &self,
        caller: Address,
        to: Address,
        amount: Payment,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.write().await;
        if caller != self.config.admin {
            warn!(caller = %caller, "Withdrawal by non-administrator");
            state.stats.rejected_operations += 1;
            return Err(BrokerError::AdminOnly);
        }
        let available = state.ledger.free_pool();
        if amount > available {
            state.stats.rejected_operations += 1;
            return Err(LedgerError::InsufficientWithdrawable {
                requested: amount,
                available,
            }
            .into());
        }
        // Asset moves first; the ledger debit below cannot fail after the
        // free-pool check under this same lock.
        self.asset.transfer(to, amount).await?;
        state.ledger.withdraw_free(amount)?;
        info!("Free-pool withdrawal complete");
        Ok(())
    }

    #[instrument(skip(self), fields(caller = %caller, to = %to, amount = amount))]
    async fn withdraw_payout(
        &self,
        caller: Address,
        to: Address,
        amount: Payment,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.write().await;
        let available = state.ledger.balance_of(caller);
        if amount > available {
            state.stats.rejected_operations += 1;
            return Err(LedgerError::InsufficientPayout {
                requested: amount,
                available,
            }
            .into());
        }
        self.asset.transfer(to, amount).await?;
        state.ledger.withdraw_payout(caller, amount)?;
        info!("Payout withdrawal complete");
        Ok(())
    }

    async fn withdrawable(&self) -> Payment {
        self.state.read().await.ledger.free_pool()
    }

    async fn balance_of(&self, who: Address) -> Payment {
        self.state.read().await.ledger.balance_of(who)
    }

    async fn commitment_exists(&self, request_id: RequestId) -> bool {
        self.state.read().await.commitments.contains(request_id)
    }

    async fn pending_count(&self) -> usize {
        self.state.read().await.commitments.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
