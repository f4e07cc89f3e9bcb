//! # Request Lifecycle Flows
//!
//! The happy path and its event trail: escrow through the token notification
//! hook, fulfillment by an authorized node, callback delivery, and the
//! commitment's disappearance afterwards.

#[cfg(test)]
mod tests {
    use crate::harness::{addr, Harness, DEFAULT_PAYMENT, NODE, REQUESTER, START, TOKEN};
    use broker_core::prelude::*;

    // =============================================================================
    // ESCROW → FULFILL → DELIVER
    // =============================================================================

    #[tokio::test]
    async fn test_full_lifecycle_single_word() {
        let h = Harness::new();
        h.authorize_node().await;
        let (id, params) = h.escrow(DEFAULT_PAYMENT, 1).await;

        assert!(h.broker.commitment_exists(id).await);
        assert_eq!(h.broker.pending_count().await, 1);

        let delivered = h
            .broker
            .fulfill_request(NODE, params, Hash::new([0x42; 32]))
            .await
            .unwrap();
        assert!(delivered);

        // Settled: commitment gone, node credited, callback ran once.
        assert!(!h.broker.commitment_exists(id).await);
        assert_eq!(h.broker.pending_count().await, 0);
        assert_eq!(h.broker.balance_of(NODE).await, DEFAULT_PAYMENT);
        assert_eq!(h.callbacks.invocation_count(), 1);

        let invocation = &h.callbacks.invocations()[0];
        assert_eq!(invocation.target, REQUESTER);
        assert_eq!(invocation.request_id, id);
        assert_eq!(invocation.data.as_slice(), &[0x42; 32]);
    }

    #[tokio::test]
    async fn test_full_lifecycle_multi_word() {
        let h = Harness::new();
        h.authorize_node().await;
        let (id, params) = h.escrow(DEFAULT_PAYMENT, 1).await;

        let response = h.bound_response(id, b"ETH/USD: 4200.55");
        let delivered = h
            .broker
            .fulfill_request_bytes(NODE, params, response.clone())
            .await
            .unwrap();
        assert!(delivered);

        // The callback receives the full response, echoed id included.
        let invocation = &h.callbacks.invocations()[0];
        assert_eq!(invocation.data, response);
        assert_eq!(&invocation.data.as_slice()[..32], id.as_bytes());
    }

    #[tokio::test]
    async fn test_event_trail_in_order() {
        let h = Harness::new();
        h.authorize_node().await;
        let (id, params) = h.escrow(DEFAULT_PAYMENT, 1).await;
        h.broker
            .fulfill_request(NODE, params, Hash::new([0x42; 32]))
            .await
            .unwrap();

        let events = h.log.events();
        // Bootstrap, created, accepted, delivered.
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], BrokerEvent::AuthorizedSendersChanged(_)));
        match &events[1] {
            BrokerEvent::RequestCreated(ev) => {
                assert_eq!(ev.request_id, id);
                assert_eq!(ev.requester, REQUESTER);
                assert_eq!(ev.payment, DEFAULT_PAYMENT);
                assert_eq!(ev.payload.as_slice(), b"GET price ETH/USD");
            }
            other => panic!("expected RequestCreated, got {other:?}"),
        }
        match &events[2] {
            BrokerEvent::ResponseAccepted(ev) => {
                assert_eq!(ev.request_id, id);
                assert_eq!(ev.node, NODE);
            }
            other => panic!("expected ResponseAccepted, got {other:?}"),
        }
        match &events[3] {
            BrokerEvent::ResponseDelivered(ev) => {
                assert_eq!(ev.request_id, id);
                assert!(ev.callback_succeeded);
            }
            other => panic!("expected ResponseDelivered, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expiration_assigned_from_clock() {
        let h = Harness::new();
        h.clock.set(START + 12_345);
        let cmd = h.command(DEFAULT_PAYMENT, 1);
        h.transfer_and_call(REQUESTER, DEFAULT_PAYMENT, Bytes::from_vec(cmd.encode()))
            .await
            .unwrap();

        let created = h
            .log
            .events()
            .into_iter()
            .find_map(|e| match e {
                BrokerEvent::RequestCreated(ev) => Some(ev),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            created.expiration,
            START + 12_345 + h.broker.config().request_expiry_secs
        );
    }

    // =============================================================================
    // ID DERIVATION
    // =============================================================================

    #[tokio::test]
    async fn test_oracle_entry_id_matches_nonce_derivation() {
        let h = Harness::new();
        let (id, _) = h.escrow(DEFAULT_PAYMENT, 77).await;
        assert_eq!(id, request_id_from_nonce(REQUESTER, 77));
        // Nodes and requesters can derive the id offline.
        assert_eq!(
            hex::encode(id.as_bytes()),
            hex::encode(request_id_from_nonce(REQUESTER, 77).as_bytes())
        );
    }

    #[tokio::test]
    async fn test_operator_entry_id_differs_from_oracle_entry() {
        let h = Harness::new();
        let mut cmd = h.command(DEFAULT_PAYMENT, 5);
        cmd.entry = RequestEntry::Operator;
        let id = h
            .transfer_and_call(REQUESTER, DEFAULT_PAYMENT, Bytes::from_vec(cmd.encode()))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(id, request_id_from_nonce(REQUESTER, 5));
    }

    #[tokio::test]
    async fn test_same_nonce_different_entries_coexist() {
        let h = Harness::new();
        let (oracle_id, _) = h.escrow(DEFAULT_PAYMENT, 5).await;

        let mut cmd = h.command(DEFAULT_PAYMENT, 5);
        cmd.entry = RequestEntry::Operator;
        let operator_id = h
            .transfer_and_call(REQUESTER, DEFAULT_PAYMENT, Bytes::from_vec(cmd.encode()))
            .await
            .unwrap()
            .unwrap();

        assert_ne!(oracle_id, operator_id);
        assert_eq!(h.broker.pending_count().await, 2);
    }

    // =============================================================================
    // INTAKE REJECTIONS
    // =============================================================================

    #[tokio::test]
    async fn test_duplicate_nonce_reverts_whole_transfer() {
        let h = Harness::new();
        h.escrow(DEFAULT_PAYMENT, 1).await;
        let before = h.asset.balance(REQUESTER);

        let cmd = h.command(DEFAULT_PAYMENT, 1);
        let err = h
            .transfer_and_call(REQUESTER, DEFAULT_PAYMENT, Bytes::from_vec(cmd.encode()))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::DuplicateRequest(_)));
        // Transfer leg reverted with the notification.
        assert_eq!(h.asset.balance(REQUESTER), before);
        assert_eq!(h.broker.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_spoofed_sender_field_rejected() {
        let h = Harness::new();
        let attacker = addr(0x66);
        h.asset.mint(attacker, 10_000);

        // Attacker funds the transfer but encodes REQUESTER as the sender to
        // burn their nonce / impersonate them.
        let cmd = h.command(DEFAULT_PAYMENT, 1);
        let err = h
            .transfer_and_call(attacker, DEFAULT_PAYMENT, Bytes::from_vec(cmd.encode()))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::SenderMismatch { .. }));
        assert_eq!(h.broker.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_understated_transfer_rejected() {
        let h = Harness::new();
        let cmd = h.command(DEFAULT_PAYMENT, 1);
        // Transfers less than the encoded payment claims.
        let err = h
            .transfer_and_call(REQUESTER, DEFAULT_PAYMENT - 1, Bytes::from_vec(cmd.encode()))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::PaymentMismatch { .. }));
    }

    #[tokio::test]
    async fn test_malformed_notification_rejected() {
        let h = Harness::new();
        let err = h
            .transfer_and_call(REQUESTER, 100, Bytes::from_slice(&[0xde, 0xad]))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Wire(WireError::TooShort { .. })));
        assert!(err.is_malformed_input());
    }

    #[tokio::test]
    async fn test_untrusted_notifier_rejected() {
        let h = Harness::new();
        let err = h
            .broker
            .on_token_transfer(addr(0x99), REQUESTER, 100, Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::UntrustedNotifier(_)));
        assert_eq!(h.broker.withdrawable().await, 0);
    }

    #[tokio::test]
    async fn test_arbitrary_payloads_survive_roundtrip() {
        let h = Harness::new();
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        for nonce in 0..8u64 {
            let len = rng.gen_range(0..200);
            let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let mut cmd = h.command(DEFAULT_PAYMENT, nonce);
            cmd.payload = Bytes::from_vec(payload.clone());
            h.transfer_and_call(REQUESTER, DEFAULT_PAYMENT, Bytes::from_vec(cmd.encode()))
                .await
                .unwrap();

            let created = h
                .log
                .events()
                .into_iter()
                .rev()
                .find_map(|e| match e {
                    BrokerEvent::RequestCreated(ev) => Some(ev),
                    _ => None,
                })
                .unwrap();
            // The payload is relayed to nodes byte-for-byte.
            assert_eq!(created.payload.as_slice(), payload.as_slice());
        }
    }

    // Sanity: TOKEN really is the configured notifier in the harness.
    #[tokio::test]
    async fn test_harness_notifier_is_token() {
        let h = Harness::new();
        assert_eq!(h.broker.config().payment_token, TOKEN);
    }
}
