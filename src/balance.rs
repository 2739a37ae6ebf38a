//! Clamped point accumulation.
//!
//! [`BalanceEngine::apply`] is the only code path that changes a balance. The
//! confirmation workflow calls it exactly once per record, inside the same
//! transaction that flips the record's confirmed flag.

use crate::ledger::{LedgerError, LedgerTx};

/// Floor-clamped balance arithmetic. There is no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceEngine {
    min_balance: i64,
}

impl BalanceEngine {
    #[must_use]
    pub fn new(min_balance: i64) -> Self {
        Self { min_balance }
    }

    /// `max(current + delta, min_balance)`, saturating on overflow.
    #[must_use]
    pub fn clamp(&self, current: i64, delta: i64) -> i64 {
        current.saturating_add(delta).max(self.min_balance)
    }

    /// Add `delta` to the balance of `identity` and persist the clamped result.
    ///
    /// Unseen identities start from 0. Not idempotent: callers guarantee a
    /// record is applied at most once.
    pub fn apply(
        &self,
        tx: &LedgerTx<'_>,
        identity: &str,
        delta: i64,
    ) -> Result<i64, LedgerError> {
        let current = tx.balance(identity)?;
        let new_balance = self.clamp(current, delta);
        tx.write_balance(identity, new_balance)?;
        tracing::debug!(identity, current, delta, new_balance, "balance applied");
        Ok(new_balance)
    }
}
