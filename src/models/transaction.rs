//! Transaction models as returned by the ledger's transaction endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{TransactionId, TransactionKind};
use crate::error::{Result, TagReportError};

/// One page of transaction groups (`{"data": [...]}`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionPage {
    /// Transaction groups in the page.
    pub data: Vec<TransactionRecord>,
}

/// A transaction group: an id plus one or more splits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Group identifier.
    pub id: TransactionId,
    /// Group attributes.
    pub attributes: TransactionAttributes,
}

/// Attributes of a transaction group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionAttributes {
    /// Splits belonging to the group; only the first one is reported on.
    pub transactions: Vec<Split>,
}

/// A single split of a transaction group.
///
/// The ledger sends many more fields; only the ones the report needs are
/// kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Signed amount in the reporting currency.
    pub amount: Decimal,
    /// Split type.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

impl TransactionRecord {
    /// Builds a single-split record. Mostly useful for fixtures.
    #[inline]
    #[must_use]
    pub fn new(id: TransactionId, amount: Decimal, kind: TransactionKind) -> Self {
        Self {
            id,
            attributes: TransactionAttributes {
                transactions: vec![Split { amount, kind }],
            },
        }
    }

    /// Returns the first split of the group.
    ///
    /// # Errors
    ///
    /// Returns [`TagReportError::DataShape`] if the group has no splits.
    #[inline]
    pub fn first_split(&self) -> Result<&Split> {
        self.attributes.transactions.first().ok_or_else(|| {
            TagReportError::DataShape(format!("transaction {} has no splits", self.id))
        })
    }
}
