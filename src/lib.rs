//! Monthly tag-group expense reports for a Firefly III ledger.
//!
//! The crate queries the ledger for one reporting window, totals the
//! configured tags into titled groups with an `Other` residual, renders a
//! self-contained HTML report and mails it.
//!
//! ```no_run
//! use firefly_tagreport::client::FireflyClient;
//! use firefly_tagreport::config::ReportConfig;
//! use firefly_tagreport::notify::SmtpNotifier;
//! use firefly_tagreport::pipeline;
//!
//! # async fn example() -> firefly_tagreport::error::Result<()> {
//! let config = ReportConfig::from_env()?;
//! let ledger = FireflyClient::from_settings(&config.ledger)?;
//! if let Some(smtp) = config.smtp.as_ref() {
//!     let notifier = SmtpNotifier::from_settings(smtp)?;
//!     let today = chrono::Local::now().date_naive();
//!     let _report = pipeline::run(&config, &ledger, &notifier, today).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod client;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod report;
