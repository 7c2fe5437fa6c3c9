//! Aggregation of ledger transactions into report figures.
//!
//! Everything here is pure apart from [`build_tag_totals`], which drives
//! the caller-supplied fetch function for each tag.

use core::future::Future;
use std::collections::HashSet;

use futures::{StreamExt as _, TryStreamExt as _, stream};
use rust_decimal::Decimal;

use crate::config::TagGroup;
use crate::error::{Result, TagReportError};
use crate::models::{BasicSummary, TransactionId, TransactionRecord};

/// Key under which the residual total is stored in [`TagTotals`].
pub const OTHER_TAG: &str = "Other";

/// Insertion-ordered mapping from tag to total amount.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagTotals {
    /// `(tag, total)` pairs, unique by tag, in insertion order.
    entries: Vec<(String, Decimal)>,
}

impl TagTotals {
    /// Creates an empty mapping.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Sets the total for `tag`, keeping its original position if it
    /// already exists. Returns the previous total.
    #[inline]
    pub fn insert<T: Into<String>>(&mut self, tag: T, total: Decimal) -> Option<Decimal> {
        let key: String = tag.into();
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.0 == key) {
            Some(core::mem::replace(&mut entry.1, total))
        } else {
            self.entries.push((key, total));
            None
        }
    }

    /// Returns the total for `tag`.
    #[inline]
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|entry| entry.0 == tag)
            .map(|entry| entry.1)
    }

    /// Returns the number of tags.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no tags.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(tag, total)` pairs in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.entries
            .iter()
            .map(|entry| (entry.0.as_str(), entry.1))
    }

    /// Sum of all totals.
    #[inline]
    #[must_use]
    pub fn sum(&self) -> Decimal {
        self.entries.iter().map(|entry| entry.1).sum()
    }

    /// Returns the entries for `tags`, in the order given, skipping tags
    /// without a total.
    #[inline]
    #[must_use]
    pub fn subset(&self, tags: &[String]) -> Self {
        let mut out = Self::new();
        for tag in tags {
            if let Some(total) = self.get(tag) {
                _ = out.insert(tag.as_str(), total);
            }
        }
        out
    }
}

impl<T: Into<String>> FromIterator<(T, Decimal)> for TagTotals {
    #[inline]
    fn from_iter<I: IntoIterator<Item = (T, Decimal)>>(iter: I) -> Self {
        let mut totals = Self::new();
        for (tag, total) in iter {
            _ = totals.insert(tag, total);
        }
        totals
    }
}

/// Per-tag totals plus the ids of every transaction some tag claimed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagBreakdown {
    /// Totals per distinct tag, in first-seen order across groups.
    pub totals: TagTotals,
    /// Ids returned by at least one tag query.
    pub claimed: HashSet<TransactionId>,
}

/// Headline figures of the general summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryTotals {
    /// Money spent in the window.
    pub expenses: Decimal,
    /// Money earned in the window.
    pub income: Decimal,
    /// Net worth at the end of the window.
    pub net_worth: Decimal,
}

impl SummaryTotals {
    /// Returns the three `(label, value)` rows in display order.
    #[inline]
    #[must_use]
    pub const fn lines(&self) -> [(&'static str, Decimal); 3] {
        [
            ("Total Expenses", self.expenses),
            ("Total Income", self.income),
            ("Net Worth", self.net_worth),
        ]
    }
}

/// Sums the first split's amount of every transaction in the set.
///
/// The set is expected to be already filtered to `tag` by the ledger.
///
/// # Errors
///
/// Returns [`TagReportError::DataShape`] if a transaction has no splits.
#[inline]
pub fn total_for_tag(tag: &str, tagged: &[TransactionRecord]) -> Result<Decimal> {
    let total = tagged
        .iter()
        .map(|record| record.first_split().map(|split| split.amount))
        .sum::<Result<Decimal>>()?;
    tracing::info!(tag = %tag, transactions = tagged.len(), total = %total, "tag total");
    Ok(total)
}

/// Returns every distinct tag across `groups`, in first-seen order.
#[inline]
#[must_use]
pub fn distinct_tags(groups: &[TagGroup]) -> Vec<&str> {
    let mut seen = HashSet::new();
    groups
        .iter()
        .flat_map(|group| group.tags.iter())
        .map(String::as_str)
        .filter(|tag| seen.insert(*tag))
        .collect()
}

/// Computes the total of every distinct tag across `groups`.
///
/// `fetch` is called once per distinct tag with at most `concurrency`
/// calls in flight. Results are folded in tag order, so the outcome is
/// the same as a sequential run.
///
/// # Errors
///
/// Fails on the first fetch error, or with
/// [`TagReportError::DataShape`] if a fetched transaction has no splits.
#[tracing::instrument(skip_all, fields(groups = groups.len(), concurrency = concurrency))]
pub async fn build_tag_totals<F, Fut>(
    groups: &[TagGroup],
    fetch: F,
    concurrency: usize,
) -> Result<TagBreakdown>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<TransactionRecord>>>,
{
    let tags = distinct_tags(groups);
    tracing::debug!(tags = tags.len(), "fetching tag transactions");

    let fetched: Vec<(String, Vec<TransactionRecord>)> = stream::iter(tags)
        .map(|tag| {
            let owned = tag.to_owned();
            let pending = fetch(owned.clone());
            async move { pending.await.map(|records| (owned, records)) }
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut breakdown = TagBreakdown::default();
    for (tag, records) in fetched {
        let total = total_for_tag(&tag, &records)?;
        _ = breakdown.totals.insert(tag, total);
        breakdown
            .claimed
            .extend(records.into_iter().map(|record| record.id));
    }
    Ok(breakdown)
}

/// Sums withdrawals in `all` whose id is not in `claimed`.
///
/// With an empty `claimed` set this is simply the sum of all
/// withdrawals.
///
/// # Errors
///
/// Returns [`TagReportError::DataShape`] if a transaction has no splits.
#[inline]
pub fn residual_other(
    all: &[TransactionRecord],
    claimed: &HashSet<TransactionId>,
) -> Result<Decimal> {
    let mut residual = Decimal::ZERO;
    for record in all {
        let split = record.first_split()?;
        if split.kind.is_withdrawal() && !claimed.contains(&record.id) {
            residual += split.amount;
        }
    }
    tracing::info!(
        transactions = all.len(),
        claimed = claimed.len(),
        residual = %residual,
        "residual total"
    );
    Ok(residual)
}

/// Extracts spent, earned and net worth for `currency` from the basic
/// summary.
///
/// # Errors
///
/// Returns [`TagReportError::MissingField`] naming the first absent key.
#[inline]
pub fn build_summary_totals(summary: &BasicSummary, currency: &str) -> Result<SummaryTotals> {
    let value = |prefix: &str| -> Result<Decimal> {
        let key = format!("{prefix}-in-{currency}");
        summary
            .get(&key)
            .map(|entry| entry.monetary_value)
            .ok_or(TagReportError::MissingField(key))
    };
    Ok(SummaryTotals {
        expenses: value("spent")?,
        income: value("earned")?,
        net_worth: value("net-worth")?,
    })
}
