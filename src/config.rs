//! Run configuration: ledger access, tag groups, reporting window and
//! mail relay settings.
//!
//! Everything is read once at start-up into a [`ReportConfig`] value that
//! is passed explicitly to the rest of the crate. Values come from a
//! key lookup function so tests can supply them without touching the
//! process environment; [`ReportConfig::from_env`] is the production
//! entry point.

use core::fmt;
use core::str::FromStr;
use core::time::Duration;

use chrono::{Datelike, Months, NaiveDate};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TagReportError};

/// Environment variable names.
pub mod keys {
    /// Ledger base URL.
    pub const FIREFLY_URL: &str = "FIREFLY_URL";
    /// Ledger personal access token.
    pub const ACCESS_TOKEN: &str = "ACCESSTOKEN";
    /// Reporting currency code.
    pub const CURRENCY: &str = "CURRENCY";
    /// Label printed in the Currency column.
    pub const CURRENCY_SYMBOL: &str = "CURRENCY_SYMBOL";
    /// Day of the previous month the window starts on.
    pub const MONTH_START: &str = "MONTH_START";
    /// Day of the current month the window ends on.
    pub const MONTH_END: &str = "MONTH_END";
    /// JSON array of tag groups.
    pub const HEADERS_AND_TAGS: &str = "HEADERS_AND_TAGS";
    /// Residual computation mode.
    pub const RESIDUAL_MODE: &str = "REPORT_RESIDUAL_MODE";
    /// Per-request timeout in seconds.
    pub const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
    /// Maximum number of tag fetches in flight.
    pub const FETCH_CONCURRENCY: &str = "FETCH_CONCURRENCY";
    /// Retries per tag fetch.
    pub const FETCH_RETRIES: &str = "FETCH_RETRIES";
    /// SMTP relay host.
    pub const SMTP_SERVER: &str = "SMTP_SERVER";
    /// SMTP submission port.
    pub const SMTP_PORT: &str = "SMTP_PORT";
    /// SMTP login, also the sender address.
    pub const SMTP_USER: &str = "SMTP_USER";
    /// SMTP password.
    pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";
    /// Recipient address.
    pub const MAIL_TO: &str = "MAIL_TO";
}

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of concurrent tag fetches.
const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// A titled collection of tags rendered as one report section.
///
/// Accepts both `title`/`tags` and the capitalised `Title`/`Tags` keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroup {
    /// Section heading.
    #[serde(alias = "Title")]
    pub title: String,
    /// Tags shown in the section, in display order.
    #[serde(alias = "Tags", default)]
    pub tags: Vec<String>,
}

impl TagGroup {
    /// Creates a tag group.
    #[inline]
    #[must_use]
    pub fn new<T, I, S>(title: T, tags: I) -> Self
    where
        T: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// How the "Other" residual is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResidualMode {
    /// Withdrawals not returned by any tag query.
    #[default]
    Exclusive,
    /// Every withdrawal in the window, tagged or not.
    AllWithdrawals,
}

impl FromStr for ResidualMode {
    type Err = TagReportError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclusive" => Ok(Self::Exclusive),
            "all-withdrawals" | "all_withdrawals" | "all" => Ok(Self::AllWithdrawals),
            other => Err(TagReportError::Config(format!(
                "{}: unknown residual mode `{other}` (expected `exclusive` or `all-withdrawals`)",
                keys::RESIDUAL_MODE
            ))),
        }
    }
}

/// The date range one report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportWindow {
    /// First day (inclusive).
    pub start: NaiveDate,
    /// Last day (inclusive).
    pub end: NaiveDate,
}

impl ReportWindow {
    /// Resolves the window for a run happening on `today`: the previous
    /// month's `start_day` through the current month's `end_day`.
    ///
    /// Days past the end of a month are clamped to its last day.
    ///
    /// # Errors
    ///
    /// Returns [`TagReportError::Config`] if a day is outside `1..=31`.
    #[inline]
    pub fn for_date(today: NaiveDate, start_day: u32, end_day: u32) -> Result<Self> {
        validate_day(keys::MONTH_START, start_day)?;
        validate_day(keys::MONTH_END, end_day)?;

        let this_month = first_of_month(today)?;
        let previous_month = this_month
            .checked_sub_months(Months::new(1))
            .ok_or_else(|| TagReportError::Config(format!("no month before {this_month}")))?;

        Ok(Self {
            start: clamp_to_month(previous_month, start_day)?,
            end: clamp_to_month(this_month, end_day)?,
        })
    }

    /// Returns the `YYYY-MM` label of the month the window starts in.
    #[inline]
    #[must_use]
    pub fn start_month_label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }

    /// Formats the query string shared by every ledger endpoint.
    #[inline]
    #[must_use]
    pub fn query_string(&self) -> String {
        format!(
            "start={}&end={}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

impl fmt::Display for ReportWindow {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Checks a day-of-month setting.
fn validate_day(key: &str, day: u32) -> Result<()> {
    if (1..=31).contains(&day) {
        Ok(())
    } else {
        Err(TagReportError::Config(format!(
            "{key} must be between 1 and 31, got {day}"
        )))
    }
}

/// Returns the first day of `date`'s month.
fn first_of_month(date: NaiveDate) -> Result<NaiveDate> {
    date.with_day(1)
        .ok_or_else(|| TagReportError::Config(format!("cannot take first day of {date}")))
}

/// Returns `day` within the month starting at `first`, clamped to the
/// month's last day.
fn clamp_to_month(first: NaiveDate, day: u32) -> Result<NaiveDate> {
    let last_day = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map_or(28, |last| last.day());
    first
        .with_day(day.min(last_day))
        .ok_or_else(|| TagReportError::Config(format!("invalid day {day} for {first}")))
}

/// Ledger connection settings.
#[derive(Debug)]
pub struct LedgerSettings {
    /// Base URL of the Firefly III instance, without trailing slash.
    pub base_url: String,
    /// Personal access token.
    pub token: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// SMTP relay settings.
#[derive(Debug)]
pub struct SmtpSettings {
    /// Relay host name.
    pub host: String,
    /// Submission port (STARTTLS).
    pub port: u16,
    /// Login name; also used as the sender address.
    pub user: String,
    /// Login password.
    pub password: SecretString,
    /// Recipient address.
    pub recipient: String,
    /// Connection timeout.
    pub timeout: Duration,
}

/// Complete configuration for one report run.
#[derive(Debug)]
pub struct ReportConfig {
    /// Ledger access.
    pub ledger: LedgerSettings,
    /// Currency code used for summary keys (e.g. `ZAR`).
    pub currency_code: String,
    /// Text shown in the Currency column.
    pub currency_label: String,
    /// Day of the previous month the window starts on.
    pub month_start: u32,
    /// Day of the current month the window ends on.
    pub month_end: u32,
    /// Report sections.
    pub tag_groups: Vec<TagGroup>,
    /// How the "Other" residual is computed.
    pub residual_mode: ResidualMode,
    /// Maximum number of tag fetches in flight.
    pub fetch_concurrency: usize,
    /// Retries per tag fetch after the first attempt.
    pub fetch_retries: u32,
    /// Mail relay, absent when `SMTP_SERVER` is unset.
    pub smtp: Option<SmtpSettings>,
}

impl ReportConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`TagReportError::Config`] if a required variable is
    /// missing or any value is malformed.
    #[inline]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`TagReportError::Config`] if a required key is missing
    /// or any value is malformed.
    #[tracing::instrument(skip_all)]
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = required(&lookup, keys::FIREFLY_URL)?
            .trim_end_matches('/')
            .to_owned();
        let token = SecretString::from(required(&lookup, keys::ACCESS_TOKEN)?);
        let timeout = Duration::from_secs(parsed_or(
            &lookup,
            keys::HTTP_TIMEOUT_SECS,
            DEFAULT_TIMEOUT_SECS,
        )?);

        let currency_code = required(&lookup, keys::CURRENCY)?;
        let currency_label = optional(&lookup, keys::CURRENCY_SYMBOL)
            .unwrap_or_else(|| currency_code.clone());

        let month_start = parsed_required(&lookup, keys::MONTH_START)?;
        validate_day(keys::MONTH_START, month_start)?;
        let month_end = parsed_required(&lookup, keys::MONTH_END)?;
        validate_day(keys::MONTH_END, month_end)?;

        let tag_groups = parse_tag_groups(&required(&lookup, keys::HEADERS_AND_TAGS)?)?;

        let residual_mode = optional(&lookup, keys::RESIDUAL_MODE)
            .map(|raw| raw.parse::<ResidualMode>())
            .transpose()?
            .unwrap_or_default();

        let fetch_concurrency: usize =
            parsed_or(&lookup, keys::FETCH_CONCURRENCY, DEFAULT_FETCH_CONCURRENCY)?;
        if fetch_concurrency == 0 {
            return Err(TagReportError::Config(format!(
                "{} must be at least 1",
                keys::FETCH_CONCURRENCY
            )));
        }
        let fetch_retries = parsed_or(&lookup, keys::FETCH_RETRIES, 0)?;

        let smtp = load_smtp(&lookup, timeout)?;

        tracing::debug!(
            base_url = %base_url,
            currency = %currency_code,
            groups = tag_groups.len(),
            smtp = smtp.is_some(),
            "configuration loaded"
        );

        Ok(Self {
            ledger: LedgerSettings {
                base_url,
                token,
                timeout,
            },
            currency_code,
            currency_label,
            month_start,
            month_end,
            tag_groups,
            residual_mode,
            fetch_concurrency,
            fetch_retries,
            smtp,
        })
    }

    /// Resolves the reporting window for a run on `today`.
    ///
    /// # Errors
    ///
    /// Returns [`TagReportError::Config`] if the configured days are
    /// invalid.
    #[inline]
    pub fn window(&self, today: NaiveDate) -> Result<ReportWindow> {
        ReportWindow::for_date(today, self.month_start, self.month_end)
    }
}

/// Reads the SMTP block. Absent `SMTP_SERVER` means no relay is
/// configured; once it is present the remaining keys are required.
fn load_smtp<F>(lookup: &F, timeout: Duration) -> Result<Option<SmtpSettings>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(host) = optional(lookup, keys::SMTP_SERVER) else {
        return Ok(None);
    };
    let port = parsed_required(lookup, keys::SMTP_PORT)?;
    let user = required(lookup, keys::SMTP_USER)?;
    let password = SecretString::from(required(lookup, keys::SMTP_PASSWORD)?);
    let recipient = optional(lookup, keys::MAIL_TO).unwrap_or_else(|| user.clone());
    Ok(Some(SmtpSettings {
        host,
        port,
        user,
        password,
        recipient,
        timeout,
    }))
}

/// Parses and validates the tag-group definition.
///
/// # Errors
///
/// Returns [`TagReportError::Config`] if the text is not a JSON array of
/// `{title, tags}` objects, the array is empty, or a title or tag is
/// blank.
pub fn parse_tag_groups(raw: &str) -> Result<Vec<TagGroup>> {
    let groups: Vec<TagGroup> = serde_json::from_str(raw).map_err(|err| {
        TagReportError::Config(format!(
            "{} is not a JSON array of {{\"title\": ..., \"tags\": [...]}} objects: {err}",
            keys::HEADERS_AND_TAGS
        ))
    })?;
    if groups.is_empty() {
        return Err(TagReportError::Config(format!(
            "{} defines no tag groups",
            keys::HEADERS_AND_TAGS
        )));
    }
    groups
        .into_iter()
        .map(|group| {
            let title = group.title.trim().to_owned();
            if title.is_empty() {
                return Err(TagReportError::Config(format!(
                    "{}: tag group with empty title",
                    keys::HEADERS_AND_TAGS
                )));
            }
            let tags = group
                .tags
                .into_iter()
                .map(|tag| {
                    let trimmed = tag.trim();
                    if trimmed.is_empty() {
                        Err(TagReportError::Config(format!(
                            "{}: group `{title}` contains an empty tag",
                            keys::HEADERS_AND_TAGS
                        )))
                    } else {
                        Ok(trimmed.to_owned())
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(TagGroup { title, tags })
        })
        .collect()
}

/// Returns a trimmed, non-empty value or `None`.
fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Returns a trimmed, non-empty value or a config error.
fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or_else(|| TagReportError::Config(format!("{key} is not set")))
}

/// Parses a required value.
fn parsed_required<F, T>(lookup: &F, key: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = required(lookup, key)?;
    raw.parse::<T>()
        .map_err(|err| TagReportError::Config(format!("{key}: invalid value `{raw}`: {err}")))
}

/// Parses an optional value, falling back to `default`.
fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|err| TagReportError::Config(format!("{key}: invalid value `{raw}`: {err}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret as _;

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (keys::FIREFLY_URL, "https://firefly.example.com/"),
            (keys::ACCESS_TOKEN, "secret-token"),
            (keys::CURRENCY, "ZAR"),
            (keys::MONTH_START, "26"),
            (keys::MONTH_END, "25"),
            (
                keys::HEADERS_AND_TAGS,
                r#"[{"Title": "Food", "Tags": ["groceries", "dining"]}]"#,
            ),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<ReportConfig> {
        ReportConfig::from_lookup(|key| env.get(key).map(|value| (*value).to_owned()))
    }

    #[test]
    fn window_spans_previous_to_current_month() {
        let window = ReportWindow::for_date(date(2024, 3, 10), 26, 25).unwrap();
        assert_eq!(window.start, date(2024, 2, 26));
        assert_eq!(window.end, date(2024, 3, 25));
        assert_eq!(window.to_string(), "2024-02-26 to 2024-03-25");
        assert_eq!(window.start_month_label(), "2024-02");
    }

    #[test]
    fn window_crosses_year_boundary() {
        let window = ReportWindow::for_date(date(2024, 1, 5), 1, 31).unwrap();
        assert_eq!(window.start, date(2023, 12, 1));
        assert_eq!(window.end, date(2024, 1, 31));
    }

    #[test]
    fn window_clamps_days_past_month_end() {
        let window = ReportWindow::for_date(date(2023, 3, 1), 31, 31).unwrap();
        assert_eq!(window.start, date(2023, 2, 28));
        assert_eq!(window.end, date(2023, 3, 31));

        let leap = ReportWindow::for_date(date(2024, 3, 15), 30, 30).unwrap();
        assert_eq!(leap.start, date(2024, 2, 29));
    }

    #[test]
    fn window_rejects_out_of_range_day() {
        assert!(matches!(
            ReportWindow::for_date(date(2024, 3, 1), 0, 25),
            Err(TagReportError::Config(_))
        ));
        assert!(matches!(
            ReportWindow::for_date(date(2024, 3, 1), 1, 32),
            Err(TagReportError::Config(_))
        ));
    }

    #[test]
    fn window_query_string() {
        let window = ReportWindow::for_date(date(2024, 3, 10), 26, 25).unwrap();
        assert_eq!(window.query_string(), "start=2024-02-26&end=2024-03-25");
    }

    #[test]
    fn parse_groups_accepts_both_key_styles() {
        let groups = parse_tag_groups(
            r#"[{"Title": "Food", "Tags": ["groceries", " dining "]},
                {"title": "Car", "tags": ["fuel"]}]"#,
        )
        .unwrap();
        assert_eq!(
            groups,
            vec![
                TagGroup::new("Food", ["groceries", "dining"]),
                TagGroup::new("Car", ["fuel"]),
            ]
        );
    }

    #[test]
    fn parse_groups_allows_empty_tag_list() {
        let groups = parse_tag_groups(r#"[{"title": "Empty", "tags": []}]"#).unwrap();
        assert!(groups.first().unwrap().tags.is_empty());
    }

    #[test]
    fn parse_groups_rejects_python_literal() {
        let err = parse_tag_groups("[{'Title': 'Food', 'Tags': ['groceries']}]").unwrap_err();
        assert!(matches!(err, TagReportError::Config(_)));
        assert!(err.to_string().contains(keys::HEADERS_AND_TAGS));
    }

    #[test]
    fn parse_groups_rejects_empty_array_and_blank_names() {
        assert!(parse_tag_groups("[]").is_err());
        assert!(parse_tag_groups(r#"[{"title": "  ", "tags": ["a"]}]"#).is_err());
        assert!(parse_tag_groups(r#"[{"title": "Food", "tags": [""]}]"#).is_err());
    }

    #[test]
    fn config_loads_with_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.ledger.base_url, "https://firefly.example.com");
        assert_eq!(config.ledger.token.expose_secret(), "secret-token");
        assert_eq!(config.ledger.timeout, Duration::from_secs(30));
        assert_eq!(config.currency_code, "ZAR");
        assert_eq!(config.currency_label, "ZAR");
        assert_eq!(config.residual_mode, ResidualMode::Exclusive);
        assert_eq!(config.fetch_concurrency, 4);
        assert_eq!(config.fetch_retries, 0);
        assert!(config.smtp.is_none());
        assert_eq!(config.tag_groups.len(), 1);
    }

    #[test]
    fn config_reads_optional_settings() {
        let mut env = base_env();
        let _old = env.insert(keys::CURRENCY_SYMBOL, "R");
        let _old = env.insert(keys::RESIDUAL_MODE, "all-withdrawals");
        let _old = env.insert(keys::FETCH_CONCURRENCY, "2");
        let _old = env.insert(keys::FETCH_RETRIES, "3");
        let _old = env.insert(keys::HTTP_TIMEOUT_SECS, "5");
        let config = load(&env).unwrap();
        assert_eq!(config.currency_label, "R");
        assert_eq!(config.residual_mode, ResidualMode::AllWithdrawals);
        assert_eq!(config.fetch_concurrency, 2);
        assert_eq!(config.fetch_retries, 3);
        assert_eq!(config.ledger.timeout, Duration::from_secs(5));
    }

    #[test]
    fn config_missing_token_is_config_error() {
        let mut env = base_env();
        let _old = env.remove(keys::ACCESS_TOKEN);
        let err = load(&env).unwrap_err();
        assert!(matches!(err, TagReportError::Config(_)));
        assert!(err.to_string().contains(keys::ACCESS_TOKEN));
    }

    #[test]
    fn config_rejects_bad_numbers() {
        let mut env = base_env();
        let _old = env.insert(keys::MONTH_START, "twenty");
        assert!(load(&env).is_err());

        let mut env = base_env();
        let _old = env.insert(keys::MONTH_END, "40");
        assert!(load(&env).is_err());

        let mut env = base_env();
        let _old = env.insert(keys::FETCH_CONCURRENCY, "0");
        assert!(load(&env).is_err());

        let mut env = base_env();
        let _old = env.insert(keys::RESIDUAL_MODE, "sometimes");
        assert!(load(&env).is_err());
    }

    #[test]
    fn config_smtp_block() {
        let mut env = base_env();
        let _old = env.insert(keys::SMTP_SERVER, "smtp.example.com");
        assert!(load(&env).is_err(), "port and credentials become required");

        let _old = env.insert(keys::SMTP_PORT, "587");
        let _old = env.insert(keys::SMTP_USER, "me@example.com");
        let _old = env.insert(keys::SMTP_PASSWORD, "hunter2");
        let config = load(&env).unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.recipient, "me@example.com");
        assert_eq!(smtp.password.expose_secret(), "hunter2");
    }

    #[test]
    fn config_window_uses_configured_days() {
        let config = load(&base_env()).unwrap();
        let window = config.window(date(2024, 6, 1)).unwrap();
        assert_eq!(window.start, date(2024, 5, 26));
        assert_eq!(window.end, date(2024, 6, 25));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = load(&base_env()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
    }
}
