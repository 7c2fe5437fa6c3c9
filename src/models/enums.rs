//! Enumeration types for constrained API values.

use serde::{Deserialize, Serialize};

/// Type of a single split inside a ledger transaction group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money leaving an asset account (an expense).
    Withdrawal,
    /// Money arriving in an asset account.
    Deposit,
    /// Movement between two asset accounts.
    Transfer,
    /// Balance reconciliation entry.
    Reconciliation,
    /// Opening balance of an account.
    #[serde(rename = "opening balance")]
    OpeningBalance,
    /// Any type this crate does not know about.
    #[serde(other)]
    Other,
}

impl TransactionKind {
    /// Returns `true` for expense-type splits.
    #[inline]
    #[must_use]
    pub const fn is_withdrawal(self) -> bool {
        matches!(self, Self::Withdrawal)
    }
}
