//! Report delivery.
//!
//! [`Notifier`] is the sink the pipeline hands the finished report to.
//! With the `smtp` feature, [`SmtpNotifier`] submits it over an
//! authenticated STARTTLS connection as a `multipart/alternative` message
//! whose plain-text part is derived from the HTML.

use core::future::Future;

use crate::error::Result;

/// Delivers a rendered report.
pub trait Notifier: core::fmt::Debug + Send + Sync {
    /// Sends `html_body` under `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::TagReportError::Mail`] if the message
    /// cannot be built or delivered.
    fn send(&self, subject: &str, html_body: &str) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(feature = "smtp")]
mod smtp {
    //! SMTP delivery via `lettre`.

    use lettre::message::{Mailbox, MultiPart};
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport as _, Message, Tokio1Executor};
    use scraper::{Html, Selector};
    use secrecy::ExposeSecret as _;

    use super::Notifier;
    use crate::config::SmtpSettings;
    use crate::error::{Result, TagReportError};

    /// Elements whose text becomes one line of the plain-text part.
    const TEXT_BLOCKS: &str = "h1, h2, tr";

    /// Wraps a `lettre` error.
    fn mail_error<E: core::error::Error + Send + Sync + 'static>(err: E) -> TagReportError {
        TagReportError::Mail(Box::new(err))
    }

    /// Derives a plain-text rendering of an HTML report.
    ///
    /// Headings become their own lines and each table row becomes one
    /// line with cells separated by two spaces. Styles are dropped.
    #[must_use]
    pub fn plain_text(html: &str) -> String {
        let document = Html::parse_document(html);
        let Ok(selector) = Selector::parse(TEXT_BLOCKS) else {
            return document.root_element().text().collect();
        };
        document
            .select(&selector)
            .map(|element| {
                element
                    .text()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join("  ")
            })
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Sends reports through an authenticated SMTP relay.
    pub struct SmtpNotifier {
        /// Relay host, kept for diagnostics.
        host: String,
        /// Async transport, one connection per send.
        transport: AsyncSmtpTransport<Tokio1Executor>,
        /// Sender mailbox.
        from: Mailbox,
        /// Recipient mailbox.
        to: Mailbox,
    }

    impl core::fmt::Debug for SmtpNotifier {
        #[inline]
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.debug_struct("SmtpNotifier")
                .field("host", &self.host)
                .field("from", &self.from.email)
                .field("to", &self.to.email)
                .finish_non_exhaustive()
        }
    }

    impl SmtpNotifier {
        /// Creates a notifier from relay settings. Nothing is spawned or
        /// connected here; every send opens its own connection, so this
        /// works outside an async runtime.
        ///
        /// # Errors
        ///
        /// Returns [`TagReportError::Mail`] if an address does not parse
        /// or TLS parameters cannot be created for the host.
        #[inline]
        pub fn from_settings(settings: &SmtpSettings) -> Result<Self> {
            let from: Mailbox = settings.user.parse().map_err(mail_error)?;
            let to: Mailbox = settings.recipient.parse().map_err(mail_error)?;
            let credentials = Credentials::new(
                settings.user.clone(),
                settings.password.expose_secret().to_owned(),
            );
            let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(mail_error)?
                .port(settings.port)
                .credentials(credentials)
                .timeout(Some(settings.timeout))
                .build();
            tracing::debug!(host = %settings.host, port = settings.port, "SMTP transport ready");
            Ok(Self {
                host: settings.host.clone(),
                transport,
                from,
                to,
            })
        }

        /// Builds the `multipart/alternative` message for a report.
        ///
        /// # Errors
        ///
        /// Returns [`TagReportError::Mail`] if the message cannot be built.
        #[inline]
        pub fn message(&self, subject: &str, html_body: &str) -> Result<Message> {
            Message::builder()
                .from(self.from.clone())
                .to(self.to.clone())
                .subject(subject)
                .multipart(MultiPart::alternative_plain_html(
                    plain_text(html_body),
                    html_body.to_owned(),
                ))
                .map_err(mail_error)
        }
    }

    impl Notifier for SmtpNotifier {
        #[tracing::instrument(skip_all, fields(host = %self.host, subject = %subject))]
        async fn send(&self, subject: &str, html_body: &str) -> Result<()> {
            let message = self.message(subject, html_body)?;
            let response = self.transport.send(message).await.map_err(mail_error)?;
            tracing::info!(code = %response.code(), "report delivered");
            Ok(())
        }
    }

}

#[cfg(feature = "smtp")]
pub use smtp::{SmtpNotifier, plain_text};
