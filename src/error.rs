//! Error types for the tag report generator.

/// All errors that can occur while producing and delivering a report.
#[derive(Debug, thiserror::Error)]
pub enum TagReportError {
    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport to the ledger failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The ledger answered with a non-success status.
    #[error("ledger API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, or a placeholder if it could not be read.
        message: String,
    },

    /// A ledger response did not have the expected structure.
    #[error("unexpected data shape: {0}")]
    DataShape(String),

    /// The basic summary lacks a currency-suffixed key.
    #[error("summary field `{0}` is missing")]
    MissingField(String),

    /// Building or delivering the email failed.
    #[error("mail delivery error: {0}")]
    Mail(Box<dyn core::error::Error + Send + Sync>),
}

impl TagReportError {
    /// Returns `true` for transport failures that may succeed on retry.
    ///
    /// Timeouts, connection failures, rate limiting and server-side
    /// errors qualify; anything describing the data itself does not.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match *self {
            Self::Http(ref err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Api { status, .. } => status == 429 || status >= 500,
            Self::Config(_)
            | Self::DataShape(_)
            | Self::MissingField(_)
            | Self::Mail(_) => false,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, TagReportError>;
