//! # Test Harness
//!
//! Shared fixture wiring an [`OracleBroker`] to the in-memory adapters, plus
//! helpers that model the payment asset's transfer-with-notification
//! primitive: asset moves and the notification succeed or revert together.

use broker_core::prelude::*;
use std::sync::Arc;

/// Administrator identity.
pub const ADMIN: Address = Address::new([0xad; 20]);
/// The trusted payment asset.
pub const TOKEN: Address = Address::new([0x70; 20]);
/// The broker's custody account at the asset.
pub const BROKER: Address = Address::new([0xbb; 20]);
/// An authorized fulfillment node.
pub const NODE: Address = Address::new([0x0e; 20]);
/// A funded requester.
pub const REQUESTER: Address = Address::new([0x1e; 20]);

/// Starting unix time for the manual clock.
pub const START: u64 = 1_700_000_000;

/// Payment escrowed by [`Harness::escrow`] unless a test overrides it.
pub const DEFAULT_PAYMENT: Payment = 1_000;

/// Shorthand address constructor.
#[must_use]
pub fn addr(n: u8) -> Address {
    Address::new([n; 20])
}

/// A broker wired to in-memory adapters.
pub struct Harness {
    pub broker: Arc<OracleBroker>,
    pub asset: Arc<InMemoryAsset>,
    pub callbacks: Arc<MeteredCallback>,
    pub clock: Arc<ManualClock>,
    pub log: Arc<InMemoryEventLog>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Creates a broker with default configuration and a funded requester.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::new(ADMIN, TOKEN))
    }

    /// Creates a broker with the given configuration.
    #[must_use]
    pub fn with_config(config: BrokerConfig) -> Self {
        let asset = Arc::new(InMemoryAsset::new(BROKER));
        asset.mint(REQUESTER, 1_000_000);
        let callbacks = Arc::new(MeteredCallback::new());
        let clock = Arc::new(ManualClock::new(START));
        let log = Arc::new(InMemoryEventLog::new());
        let broker = Arc::new(OracleBroker::new(
            config,
            asset.clone(),
            callbacks.clone(),
            clock.clone(),
            log.clone(),
        ));
        Self {
            broker,
            asset,
            callbacks,
            clock,
            log,
        }
    }

    /// Authorizes [`NODE`] as the sole fulfiller.
    pub async fn authorize_node(&self) {
        self.broker
            .set_authorized_senders(ADMIN, vec![NODE])
            .await
            .expect("sender-set bootstrap");
    }

    /// A well-formed oracle-entry request command from [`REQUESTER`].
    #[must_use]
    pub fn command(&self, payment: Payment, nonce: Nonce) -> RequestCommand {
        RequestCommand {
            entry: RequestEntry::Oracle,
            sender: REQUESTER,
            payment,
            service_id: ServiceId::new(Hash::new([0x5e; 32])),
            callback_address: REQUESTER,
            callback_selector: Selector::new([0xca, 0x11, 0xba, 0xcc]),
            nonce,
            data_version: DataVersion::new(1),
            payload: Bytes::from_slice(b"GET price ETH/USD"),
        }
    }

    /// Models `transferAndCall(broker, amount, data)` from `sender`: the
    /// asset leg and the notification succeed or revert together.
    pub async fn transfer_and_call(
        &self,
        sender: Address,
        amount: Payment,
        data: Bytes,
    ) -> Result<Option<RequestId>, BrokerError> {
        self.asset
            .move_tokens(sender, BROKER, amount)
            .map_err(BrokerError::from)?;
        match self.broker.on_token_transfer(TOKEN, sender, amount, data).await {
            Ok(id) => Ok(id),
            Err(e) => {
                // Revert the transfer leg along with the rejected call.
                self.asset
                    .move_tokens(BROKER, sender, amount)
                    .map_err(BrokerError::from)?;
                Err(e)
            }
        }
    }

    /// Escrows a request and returns its id with the fulfillment parameters
    /// nodes reconstruct from the request event.
    pub async fn escrow(&self, payment: Payment, nonce: Nonce) -> (RequestId, FulfillmentParams) {
        let cmd = self.command(payment, nonce);
        let id = self
            .transfer_and_call(REQUESTER, payment, Bytes::from_vec(cmd.encode()))
            .await
            .expect("escrow accepted")
            .expect("request, not plain deposit");
        let params = FulfillmentParams {
            request_id: id,
            payment,
            callback_address: cmd.callback_address,
            callback_selector: cmd.callback_selector,
            expiration: self.expiration(),
        };
        (id, params)
    }

    /// The expiration the broker assigns to a request accepted now.
    #[must_use]
    pub fn expiration(&self) -> u64 {
        self.clock.now() + self.broker.config().request_expiry_secs
    }

    /// A multi-word response correctly bound to `id`.
    #[must_use]
    pub fn bound_response(&self, id: RequestId, payload: &[u8]) -> Bytes {
        let mut bytes = id.as_bytes().to_vec();
        bytes.extend_from_slice(payload);
        Bytes::from_vec(bytes)
    }
}
