//! HTTP client for the Firefly III API.

use core::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use secrecy::{ExposeSecret as _, SecretString};

use crate::config::{LedgerSettings, ReportWindow};
use crate::error::{Result, TagReportError};
use crate::ledger::LedgerSource;
use crate::models::{BasicSummary, TransactionPage, TransactionRecord};

/// All transactions endpoint path.
const TRANSACTIONS_PATH: &str = "/api/v1/transactions";

/// Basic summary endpoint path.
const SUMMARY_PATH: &str = "/api/v1/summary/basic";

/// Default per-request timeout when none is configured.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the per-tag transactions path, with the tag percent-encoded.
fn tag_transactions_path(tag: &str) -> String {
    format!("/api/v1/tags/{}/transactions", urlencoding::encode(tag))
}

/// Builder for constructing a [`FireflyClient`].
#[derive(Debug, Default)]
pub struct FireflyClientBuilder {
    /// Personal access token.
    token: Option<SecretString>,
    /// Base URL of the Firefly III instance.
    base_url: Option<String>,
    /// Per-request timeout.
    timeout: Option<Duration>,
}

impl FireflyClientBuilder {
    /// Sets the personal access token.
    #[inline]
    #[must_use]
    pub fn token<T: Into<String>>(mut self, token: T) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Sets the base URL of the Firefly III instance.
    #[inline]
    #[must_use]
    pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Bounds every request by `timeout`.
    #[inline]
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`TagReportError::Config`] if the token or base URL is
    /// missing.
    /// Returns [`TagReportError::Http`] if the HTTP client fails to build.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn build(self) -> Result<FireflyClient> {
        let token = self
            .token
            .ok_or_else(|| TagReportError::Config("access token is required".to_owned()))?;
        let base_url = self
            .base_url
            .map(|url| url.trim_end_matches('/').to_owned())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| TagReportError::Config("base URL is required".to_owned()))?;
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        tracing::debug!(base_url = %base_url, timeout_secs = timeout.as_secs(), "building client");
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(FireflyClient {
            http,
            token,
            base_url,
        })
    }
}

/// Async client for the Firefly III API.
///
/// Use [`FireflyClient::builder()`] or [`FireflyClient::from_settings()`]
/// to construct an instance.
#[derive(Debug)]
pub struct FireflyClient {
    /// Underlying HTTP client.
    http: reqwest::Client,
    /// Bearer access token.
    token: SecretString,
    /// API base URL.
    base_url: String,
}

impl FireflyClient {
    /// Creates a new builder for configuring the client.
    #[inline]
    #[must_use]
    pub fn builder() -> FireflyClientBuilder {
        FireflyClientBuilder::default()
    }

    /// Builds a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TagReportError::Http`] if the HTTP client fails to build.
    #[inline]
    pub fn from_settings(settings: &LedgerSettings) -> Result<Self> {
        Self::builder()
            .token(settings.token.expose_secret())
            .base_url(settings.base_url.as_str())
            .timeout(settings.timeout)
            .build()
    }

    /// Sends an authenticated GET for `path` over `window` and
    /// deserializes the response.
    #[tracing::instrument(skip_all, fields(path = %path))]
    async fn get_json<Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        window: &ReportWindow,
    ) -> Result<Resp> {
        let url = format!("{}{path}?{}", self.base_url, window.query_string());
        tracing::trace!(url = %url, "sending GET request");
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token.expose_secret()))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        Self::handle_response(path, response).await
    }

    /// Handles an HTTP response, checking status and deserializing the body.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        tracing::debug!(status = %status, "received response");
        if status.is_success() {
            let body = response.text().await?;
            tracing::trace!(body_len = body.len(), "parsing response body");
            serde_json::from_str(&body)
                .map_err(|err| TagReportError::DataShape(format!("{path}: {err}")))
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_owned());
            tracing::debug!(status = status.as_u16(), message = %message, "API error");
            Err(TagReportError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl LedgerSource for FireflyClient {
    #[tracing::instrument(skip_all, fields(window = %window))]
    async fn transactions(&self, window: &ReportWindow) -> Result<Vec<TransactionRecord>> {
        let page: TransactionPage = self.get_json(TRANSACTIONS_PATH, window).await?;
        tracing::debug!(count = page.data.len(), "fetched transactions");
        Ok(page.data)
    }

    #[tracing::instrument(skip_all, fields(tag = %tag))]
    async fn tag_transactions(
        &self,
        tag: &str,
        window: &ReportWindow,
    ) -> Result<Vec<TransactionRecord>> {
        let page: TransactionPage = self.get_json(&tag_transactions_path(tag), window).await?;
        tracing::debug!(count = page.data.len(), "fetched tagged transactions");
        Ok(page.data)
    }

    #[tracing::instrument(skip_all)]
    async fn basic_summary(&self, window: &ReportWindow) -> Result<BasicSummary> {
        self.get_json(SUMMARY_PATH, window).await
    }
}
