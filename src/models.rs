//! Data models for the Firefly III responses the report consumes.
//!
//! Only the fields the report needs are modelled; unknown fields in the
//! ledger's JSON are ignored.

mod enums;
mod ids;
mod summary;
mod transaction;

pub use enums::TransactionKind;
pub use ids::TransactionId;
pub use summary::{BasicSummary, SummaryEntry};
pub use transaction::{Split, TransactionAttributes, TransactionPage, TransactionRecord};
