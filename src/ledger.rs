//! Data-source abstraction over the ledger.
//!
//! The report only needs three queries. [`LedgerSource`] names them so the
//! aggregation pipeline can run against the HTTP client in production and
//! against [`InMemoryLedger`] in tests and offline previews.

use core::future::Future;
use std::collections::HashMap;

use crate::config::ReportWindow;
use crate::error::{Result, TagReportError};
use crate::models::{BasicSummary, TransactionRecord};

/// Read access to the ledger for one reporting window.
pub trait LedgerSource: core::fmt::Debug + Send + Sync {
    /// Returns every transaction group in the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be reached, answers with a
    /// non-success status, or returns an unexpected shape.
    fn transactions(
        &self,
        window: &ReportWindow,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>>> + Send;

    /// Returns the transaction groups carrying `tag` in the window.
    ///
    /// # Errors
    ///
    /// Same conditions as [`LedgerSource::transactions`].
    fn tag_transactions(
        &self,
        tag: &str,
        window: &ReportWindow,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>>> + Send;

    /// Returns the basic income/expense/net-worth summary for the window.
    ///
    /// # Errors
    ///
    /// Same conditions as [`LedgerSource::transactions`].
    fn basic_summary(
        &self,
        window: &ReportWindow,
    ) -> impl Future<Output = Result<BasicSummary>> + Send;
}

/// Fixed, in-memory ledger contents.
///
/// Ignores the window; whatever was loaded is returned. Unknown tags
/// yield an empty list, matching the HTTP API for an unused tag.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedger {
    /// All transaction groups.
    transactions: Vec<TransactionRecord>,
    /// Transaction groups per tag.
    tagged: HashMap<String, Vec<TransactionRecord>>,
    /// Basic summary.
    summary: BasicSummary,
    /// Tags whose lookup should fail.
    failing_tags: Vec<String>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the full transaction list.
    #[inline]
    #[must_use]
    pub fn with_transactions(mut self, transactions: Vec<TransactionRecord>) -> Self {
        self.transactions = transactions;
        self
    }

    /// Sets the transactions returned for `tag`.
    #[inline]
    #[must_use]
    pub fn with_tag<T: Into<String>>(mut self, tag: T, transactions: Vec<TransactionRecord>) -> Self {
        drop(self.tagged.insert(tag.into(), transactions));
        self
    }

    /// Sets the basic summary.
    #[inline]
    #[must_use]
    pub fn with_summary(mut self, summary: BasicSummary) -> Self {
        self.summary = summary;
        self
    }

    /// Makes lookups of `tag` fail with a server error.
    #[inline]
    #[must_use]
    pub fn with_failing_tag<T: Into<String>>(mut self, tag: T) -> Self {
        self.failing_tags.push(tag.into());
        self
    }
}

impl LedgerSource for InMemoryLedger {
    async fn transactions(&self, _window: &ReportWindow) -> Result<Vec<TransactionRecord>> {
        Ok(self.transactions.clone())
    }

    async fn tag_transactions(
        &self,
        tag: &str,
        _window: &ReportWindow,
    ) -> Result<Vec<TransactionRecord>> {
        if self.failing_tags.iter().any(|failing| failing == tag) {
            return Err(TagReportError::Api {
                status: 500,
                message: format!("lookup of tag {tag} failed"),
            });
        }
        Ok(self.tagged.get(tag).cloned().unwrap_or_default())
    }

    async fn basic_summary(&self, _window: &ReportWindow) -> Result<BasicSummary> {
        Ok(self.summary.clone())
    }
}
