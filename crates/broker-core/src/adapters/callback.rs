//! # Metered Callback Adapter
//!
//! Invokes registered consumer behaviors under the pre-committed compute
//! budget. Consumers are untrusted: a behavior may revert or burn the whole
//! budget, and the adapter records every invocation for inspection.

use crate::domain::value_objects::{ComputeBudget, RequestId};
use crate::ports::outbound::{CallbackInvoker, CallbackOutcome};
use async_trait::async_trait;
use broker_types::{Address, Bytes, Selector};
use std::collections::HashMap;
use std::sync::RwLock;

/// Compute cost of a representative simple consumer callback.
pub const DEFAULT_CONSUMER_COST: u64 = 50_000;

/// Scripted behavior of a consumer callback target.
#[derive(Clone, Debug)]
pub enum ConsumerBehavior {
    /// Completes after consuming `cost` compute units.
    Succeed {
        /// Compute consumed by the callback.
        cost: u64,
    },
    /// Aborts itself with a reason.
    Revert {
        /// Abort reason.
        reason: String,
    },
    /// Consumes the entire budget and then some.
    ExhaustBudget,
}

/// One recorded callback invocation.
#[derive(Clone, Debug)]
pub struct RecordedInvocation {
    /// Callback target.
    pub target: Address,
    /// Callback selector.
    pub selector: Selector,
    /// Request the delivery was for.
    pub request_id: RequestId,
    /// Delivered data (response word or full response bytes).
    pub data: Bytes,
    /// Budget ceiling the invocation ran under.
    pub budget_limit: u64,
    /// Outcome of the invocation.
    pub outcome: CallbackOutcome,
}

/// Budget-metered callback invoker for testing.
#[derive(Debug, Default)]
pub struct MeteredCallback {
    behaviors: RwLock<HashMap<Address, ConsumerBehavior>>,
    invocations: RwLock<Vec<RecordedInvocation>>,
}

impl MeteredCallback {
    /// Creates an invoker with no scripted consumers; unknown targets
    /// succeed at [`DEFAULT_CONSUMER_COST`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the behavior of a consumer target.
    pub fn set_behavior(&self, target: Address, behavior: ConsumerBehavior) {
        self.behaviors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(target, behavior);
    }

    /// All recorded invocations, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of recorded invocations.
    #[must_use]
    pub fn invocation_count(&self) -> usize {
        self.invocations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn behavior_for(&self, target: Address) -> ConsumerBehavior {
        self.behaviors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&target)
            .cloned()
            .unwrap_or(ConsumerBehavior::Succeed {
                cost: DEFAULT_CONSUMER_COST,
            })
    }
}

#[async_trait]
impl CallbackInvoker for MeteredCallback {
    async fn invoke(
        &self,
        target: Address,
        selector: Selector,
        request_id: RequestId,
        data: Bytes,
        mut budget: ComputeBudget,
    ) -> CallbackOutcome {
        let outcome = match self.behavior_for(target) {
            ConsumerBehavior::Succeed { cost } => {
                if budget.consume(cost) {
                    CallbackOutcome::Delivered {
                        compute_used: budget.used(),
                    }
                } else {
                    CallbackOutcome::BudgetExhausted {
                        budget: budget.limit(),
                    }
                }
            }
            ConsumerBehavior::Revert { reason } => CallbackOutcome::Reverted { reason },
            ConsumerBehavior::ExhaustBudget => CallbackOutcome::BudgetExhausted {
                budget: budget.limit(),
            },
        };

        self.invocations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedInvocation {
                target,
                selector,
                request_id,
                data,
                budget_limit: budget.limit(),
                outcome: outcome.clone(),
            });

        outcome
    }
}
