//! # In-Memory Payment Asset
//!
//! Account-balance map standing in for the external payment asset. The
//! broker's custody account is fixed at construction; `PaymentAsset`
//! transfers always draw from it.

use crate::errors::AssetError;
use crate::ports::outbound::PaymentAsset;
use async_trait::async_trait;
use broker_types::{Address, Payment};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory fungible asset for testing.
#[derive(Debug)]
pub struct InMemoryAsset {
    /// The broker's custody account.
    broker: Address,
    /// Account balances.
    balances: RwLock<HashMap<Address, Payment>>,
}

impl InMemoryAsset {
    /// Creates an empty asset with the given broker custody account.
    #[must_use]
    pub fn new(broker: Address) -> Self {
        Self {
            broker,
            balances: RwLock::new(HashMap::new()),
        }
    }

    /// Mints asset into an account (test setup).
    pub fn mint(&self, to: Address, amount: Payment) {
        let mut balances = self.balances.write().unwrap_or_else(|e| e.into_inner());
        *balances.entry(to).or_insert(0) += amount;
    }

    /// Moves asset between arbitrary accounts (simulates a user transfer,
    /// including the transfer leg of transfer-with-notification).
    pub fn move_tokens(
        &self,
        from: Address,
        to: Address,
        amount: Payment,
    ) -> Result<(), AssetError> {
        let mut balances = self.balances.write().unwrap_or_else(|e| e.into_inner());
        let available = balances.get(&from).copied().unwrap_or(0);
        if amount > available {
            return Err(AssetError::InsufficientFunds {
                requested: amount,
                available,
            });
        }
        *balances.entry(from).or_insert(0) -= amount;
        *balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    /// Balance of an account (sync helper for assertions).
    #[must_use]
    pub fn balance(&self, who: Address) -> Payment {
        self.balances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&who)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PaymentAsset for InMemoryAsset {
    async fn transfer(&self, to: Address, amount: Payment) -> Result<(), AssetError> {
        self.move_tokens(self.broker, to, amount)
    }

    async fn balance_of(&self, who: Address) -> Payment {
        self.balance(who)
    }
}
