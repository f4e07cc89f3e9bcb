//! # Funds Ledger
//!
//! Accounting for the single fungible payment asset custodied by the broker.
//!
//! Every held unit is in exactly one of three places:
//! - **committed**: escrowed for a pending request,
//! - **payout balances**: credited to a node (fulfillment) or a requester
//!   (cancellation refund), or
//! - **free pool**: everything else, including asset sent to the broker
//!   outside the escrow flow. Only the administrator can withdraw from it.
//!
//! Conservation: `total_held == total_committed + Σ payouts + free_pool`.

use crate::errors::LedgerError;
use broker_types::{Address, Payment};
use std::collections::HashMap;

/// Balance sheet for the broker's custody of the payment asset.
#[derive(Debug, Default, Clone)]
pub struct FundsLedger {
    /// Asset actually custodied by the broker.
    total_held: Payment,
    /// Sum of `payment` over all currently-pending commitments.
    total_committed: Payment,
    /// Per-identity credited balances (node earnings, requester refunds).
    payouts: HashMap<Address, Payment>,
}

impl FundsLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asset custodied in total.
    #[must_use]
    pub fn total_held(&self) -> Payment {
        self.total_held
    }

    /// Escrowed-but-unreleased total.
    #[must_use]
    pub fn total_committed(&self) -> Payment {
        self.total_committed
    }

    /// Credited payout balance of an identity.
    #[must_use]
    pub fn balance_of(&self, who: Address) -> Payment {
        self.payouts.get(&who).copied().unwrap_or(0)
    }

    /// Sum of all credited payout balances.
    #[must_use]
    pub fn total_payouts(&self) -> Payment {
        self.payouts.values().sum()
    }

    /// Uncommitted, unreserved asset: the administrator-withdrawable pool.
    ///
    /// Asset sent to the broker outside the escrow flow lands here, which is
    /// why recovering misdirected funds needs no separate code path.
    #[must_use]
    pub fn free_pool(&self) -> Payment {
        self.total_held
            .saturating_sub(self.total_committed)
            .saturating_sub(self.total_payouts())
    }

    /// Records an asset deposit without escrow (free pool grows).
    pub fn deposit(&mut self, amount: Payment) -> Result<(), LedgerError> {
        self.total_held = self
            .total_held
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Records an asset deposit escrowed for a pending request.
    ///
    /// Validates both balance updates before assigning either, so a failure
    /// leaves the ledger untouched.
    pub fn deposit_and_commit(&mut self, amount: Payment) -> Result<(), LedgerError> {
        let held = self
            .total_held
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let committed = self
            .total_committed
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.total_held = held;
        self.total_committed = committed;
        Ok(())
    }

    /// Moves escrow for a settled request into an identity's payout balance.
    ///
    /// Used both for fulfillment (credit the node) and cancellation (credit
    /// the original requester).
    pub fn release(&mut self, amount: Payment, to: Address) -> Result<(), LedgerError> {
        if amount > self.total_committed {
            return Err(LedgerError::ReleaseExceedsCommitted {
                requested: amount,
                committed: self.total_committed,
            });
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.total_committed -= amount;
        self.payouts.insert(to, credited);
        Ok(())
    }

    /// Withdraws from the free pool (administrator surface).
    pub fn withdraw_free(&mut self, amount: Payment) -> Result<(), LedgerError> {
        let available = self.free_pool();
        if amount > available {
            return Err(LedgerError::InsufficientWithdrawable {
                requested: amount,
                available,
            });
        }
        self.total_held -= amount;
        Ok(())
    }

    /// Withdraws from an identity's credited payout balance.
    pub fn withdraw_payout(&mut self, who: Address, amount: Payment) -> Result<(), LedgerError> {
        let available = self.balance_of(who);
        if amount > available {
            return Err(LedgerError::InsufficientPayout {
                requested: amount,
                available,
            });
        }
        if available == amount {
            self.payouts.remove(&who);
        } else {
            self.payouts.insert(who, available - amount);
        }
        self.total_held -= amount;
        Ok(())
    }

    /// Checks the conservation invariant.
    #[must_use]
    pub fn is_conserved(&self) -> bool {
        self.total_committed
            .checked_add(self.total_payouts())
            .is_some_and(|reserved| reserved <= self.total_held)
    }
}
