//! End-to-end report run: fetch, aggregate, render, deliver.

use core::time::Duration;
use std::collections::HashSet;

use chrono::NaiveDate;

use crate::aggregate::{
    OTHER_TAG, SummaryTotals, TagTotals, build_summary_totals, build_tag_totals, residual_other,
};
use crate::config::{ReportConfig, ReportWindow, ResidualMode};
use crate::error::{Result, TagReportError};
use crate::ledger::LedgerSource;
use crate::models::TransactionRecord;
use crate::notify::Notifier;
use crate::report::ReportBuilder;

/// Delay before the first retry of a failed tag fetch; doubles per retry.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// A rendered report ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    /// Window the report covers.
    pub window: ReportWindow,
    /// Mail subject.
    pub subject: String,
    /// Complete HTML document.
    pub html: String,
    /// Per-tag totals including the `Other` residual.
    pub totals: TagTotals,
    /// Summary figures, absent when the ledger summary lacked a key.
    pub summary: Option<SummaryTotals>,
}

/// Returns the mail subject for `window`.
#[inline]
#[must_use]
pub fn subject_for(window: &ReportWindow) -> String {
    format!("FireflyIII: Tag Report for {}", window.start_month_label())
}

/// Fetches the transactions for `tag`, retrying transport failures up to
/// `retries` times with exponential backoff.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or immediately for
/// errors that are not retryable.
pub async fn fetch_with_retry<L: LedgerSource>(
    ledger: &L,
    tag: String,
    window: &ReportWindow,
    retries: u32,
) -> Result<Vec<TransactionRecord>> {
    let mut attempt: u32 = 0;
    loop {
        match ledger.tag_transactions(&tag, window).await {
            Ok(records) => return Ok(records),
            Err(err) if attempt < retries && err.is_retryable() => {
                let delay = RETRY_BASE_DELAY.saturating_mul(2_u32.saturating_pow(attempt));
                attempt += 1;
                tracing::warn!(
                    tag = %tag,
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "tag fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Fetches everything the report needs for `window` and renders it.
///
/// # Errors
///
/// Fails on any transport or data-shape error. A summary lacking the
/// configured currency's keys is not fatal: it is logged and the summary
/// section says the figures are unavailable.
#[tracing::instrument(skip_all, fields(window = %window))]
pub async fn generate_report<L: LedgerSource>(
    config: &ReportConfig,
    ledger: &L,
    window: &ReportWindow,
) -> Result<RenderedReport> {
    let all = ledger.transactions(window).await?;
    tracing::info!(transactions = all.len(), "fetched window transactions");

    let retries = config.fetch_retries;
    let breakdown = build_tag_totals(
        &config.tag_groups,
        |tag| fetch_with_retry(ledger, tag, window, retries),
        config.fetch_concurrency,
    )
    .await?;

    let unclaimed = HashSet::new();
    let claimed = match config.residual_mode {
        ResidualMode::Exclusive => &breakdown.claimed,
        ResidualMode::AllWithdrawals => &unclaimed,
    };
    let other = residual_other(&all, claimed)?;
    let mut totals = breakdown.totals;
    _ = totals.insert(OTHER_TAG, other);

    let basic = ledger.basic_summary(window).await?;
    let summary = match build_summary_totals(&basic, &config.currency_code) {
        Ok(summary) => Some(summary),
        Err(TagReportError::MissingField(key)) => {
            tracing::warn!(key = %key, "summary field missing, omitting summary figures");
            None
        }
        Err(err) => return Err(err),
    };

    let html = ReportBuilder::new(config.currency_label.as_str()).document(
        &config.tag_groups,
        &totals,
        summary.as_ref(),
        window,
    );
    tracing::debug!(html_len = html.len(), tags = totals.len(), "report rendered");

    Ok(RenderedReport {
        window: *window,
        subject: subject_for(window),
        html,
        totals,
        summary,
    })
}

/// Runs one scheduled report: resolves the window for `today`, renders
/// the report and hands it to `notifier`.
///
/// Nothing is sent unless rendering succeeded completely.
///
/// # Errors
///
/// Returns the first configuration, transport, data-shape or delivery
/// error.
#[tracing::instrument(skip_all, fields(today = %today))]
pub async fn run<L: LedgerSource, N: Notifier>(
    config: &ReportConfig,
    ledger: &L,
    notifier: &N,
    today: NaiveDate,
) -> Result<RenderedReport> {
    let window = config.window(today)?;
    let report = generate_report(config, ledger, &window).await?;
    notifier.send(&report.subject, &report.html).await?;
    tracing::info!(subject = %report.subject, "report sent");
    Ok(report)
}
