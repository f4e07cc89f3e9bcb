//! # Settlement Re-Entry
//!
//! A hostile callback target that calls back into the broker while its own
//! delivery is in flight. Settlement is checks-effects-interactions: the
//! commitment is deleted and payment released before the callback runs, so
//! every re-entry finds the request already settled.

#[cfg(test)]
mod tests {
    use crate::harness::{ADMIN, NODE, REQUESTER, START, TOKEN};
    use broker_core::prelude::*;
    use std::sync::{Arc, Mutex, RwLock};

    const PAYMENT: Payment = 1_000;

    /// What the hostile callback does when invoked.
    #[derive(Clone, Copy, Debug)]
    enum ReentryMode {
        /// Re-submit the same fulfillment to be paid twice.
        Refulfill,
        /// Cancel the request mid-delivery to refund the requester.
        Cancel,
    }

    /// Callback target that re-enters the broker during delivery.
    #[derive(Default)]
    struct ReentrantInvoker {
        broker: RwLock<Option<Arc<OracleBroker>>>,
        params: RwLock<Option<FulfillmentParams>>,
        mode: RwLock<Option<ReentryMode>>,
        reentry_results: Mutex<Vec<BrokerError>>,
    }

    impl ReentrantInvoker {
        fn arm(&self, broker: Arc<OracleBroker>, params: FulfillmentParams, mode: ReentryMode) {
            *self.broker.write().unwrap() = Some(broker);
            *self.params.write().unwrap() = Some(params);
            *self.mode.write().unwrap() = Some(mode);
        }

        fn recorded(&self) -> Vec<BrokerError> {
            self.reentry_results.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CallbackInvoker for ReentrantInvoker {
        async fn invoke(
            &self,
            _target: Address,
            _selector: Selector,
            _request_id: RequestId,
            _data: Bytes,
            _budget: ComputeBudget,
        ) -> CallbackOutcome {
            let broker = self.broker.read().unwrap().clone();
            let params = *self.params.read().unwrap();
            let mode = self.mode.write().unwrap().take();
            let (Some(broker), Some(params), Some(mode)) = (broker, params, mode) else {
                return CallbackOutcome::Delivered { compute_used: 0 };
            };

            let result = match mode {
                ReentryMode::Refulfill => broker
                    .fulfill_request(NODE, params, Hash::new([0x66; 32]))
                    .await
                    .map(|_| ()),
                ReentryMode::Cancel => {
                    broker
                        .cancel_request(
                            REQUESTER,
                            params.request_id,
                            params.payment,
                            params.callback_selector,
                            params.expiration,
                        )
                        .await
                }
            };
            if let Err(e) = result {
                self.reentry_results.lock().unwrap().push(e);
            }
            CallbackOutcome::Delivered { compute_used: 0 }
        }
    }

    struct ReentryFixture {
        broker: Arc<OracleBroker>,
        invoker: Arc<ReentrantInvoker>,
        clock: Arc<ManualClock>,
    }

    async fn fixture() -> (ReentryFixture, RequestId, FulfillmentParams) {
        let asset = Arc::new(InMemoryAsset::new(Address::new([0xbb; 20])));
        let invoker = Arc::new(ReentrantInvoker::default());
        let clock = Arc::new(ManualClock::new(START));
        let log = Arc::new(InMemoryEventLog::new());
        let broker = Arc::new(OracleBroker::new(
            BrokerConfig::new(ADMIN, TOKEN),
            asset,
            invoker.clone(),
            clock.clone(),
            log,
        ));
        broker
            .set_authorized_senders(ADMIN, vec![NODE])
            .await
            .unwrap();

        let cmd = RequestCommand {
            entry: RequestEntry::Oracle,
            sender: REQUESTER,
            payment: PAYMENT,
            service_id: ServiceId::new(Hash::new([0x5e; 32])),
            callback_address: REQUESTER,
            callback_selector: Selector::new([0xca, 0x11, 0xba, 0xcc]),
            nonce: 1,
            data_version: DataVersion::new(1),
            payload: Bytes::from_slice(b"job"),
        };
        let id = broker
            .on_token_transfer(TOKEN, REQUESTER, PAYMENT, Bytes::from_vec(cmd.encode()))
            .await
            .unwrap()
            .unwrap();
        let params = FulfillmentParams {
            request_id: id,
            payment: PAYMENT,
            callback_address: REQUESTER,
            callback_selector: cmd.callback_selector,
            expiration: START + broker.config().request_expiry_secs,
        };
        (
            ReentryFixture {
                broker,
                invoker,
                clock,
            },
            id,
            params,
        )
    }

    #[tokio::test]
    async fn test_reentrant_refulfillment_cannot_double_pay() {
        let (fx, id, params) = fixture().await;
        fx.invoker.arm(fx.broker.clone(), params, ReentryMode::Refulfill);

        let delivered = fx
            .broker
            .fulfill_request(NODE, params, Hash::new([0x42; 32]))
            .await
            .unwrap();
        assert!(delivered);

        // The re-entry ran and was turned away: the commitment was already
        // deleted when the callback started.
        let recorded = fx.invoker.recorded();
        assert_eq!(recorded.len(), 1);
        assert!(matches!(recorded[0], BrokerError::UnknownRequest(_)));

        // Paid exactly once.
        assert_eq!(fx.broker.balance_of(NODE).await, PAYMENT);
        assert!(!fx.broker.commitment_exists(id).await);
    }

    #[tokio::test]
    async fn test_reentrant_cancellation_cannot_undo_settlement() {
        let (fx, _, params) = fixture().await;
        // Let the expiration pass so only the commitment check stands
        // between the hostile callback and a refund.
        fx.clock.set(params.expiration);
        fx.invoker.arm(fx.broker.clone(), params, ReentryMode::Cancel);

        fx.broker
            .fulfill_request(NODE, params, Hash::new([0x42; 32]))
            .await
            .unwrap();

        let recorded = fx.invoker.recorded();
        assert_eq!(recorded.len(), 1);
        assert!(matches!(recorded[0], BrokerError::UnknownRequest(_)));

        // The node keeps the payment; the requester got nothing back.
        assert_eq!(fx.broker.balance_of(NODE).await, PAYMENT);
        assert_eq!(fx.broker.balance_of(REQUESTER).await, 0);
    }

    #[tokio::test]
    async fn test_escrow_conserved_after_reentry_attempts() {
        let (fx, _, params) = fixture().await;
        fx.invoker.arm(fx.broker.clone(), params, ReentryMode::Refulfill);
        fx.broker
            .fulfill_request(NODE, params, Hash::new([0x42; 32]))
            .await
            .unwrap();

        // held == payouts: nothing committed, nothing minted by the attack.
        assert_eq!(fx.broker.withdrawable().await, 0);
        assert_eq!(fx.broker.balance_of(NODE).await, PAYMENT);
        assert_eq!(fx.broker.pending_count().await, 0);
    }
}
