//! CLI binary that builds the monthly tag report and mails it.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use firefly_tagreport::aggregate::OTHER_TAG;
use firefly_tagreport::client::FireflyClient;
use firefly_tagreport::config::{ReportConfig, keys};
use firefly_tagreport::error::{Result, TagReportError};
use firefly_tagreport::notify::SmtpNotifier;
use firefly_tagreport::pipeline::{self, RenderedReport, generate_report};
use firefly_tagreport::report::format_amount;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Firefly III tag report: totals tagged expenses for the month and mails
/// an HTML summary.
#[derive(Debug, Parser)]
#[command(name = "tagreport", version, about)]
struct Cli {
    /// Load settings from this env file instead of `./.env`.
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,
    /// Print the totals to the terminal instead of sending mail.
    #[arg(long)]
    preview: bool,
    /// Write the HTML report to this file instead of sending mail.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

impl Cli {
    /// Whether the report should be mailed.
    const fn delivers(&self) -> bool {
        !self.preview && self.output.is_none()
    }
}

/// Prints an error line in the CLI's format.
fn report_error(context: &str, err: &dyn core::fmt::Display) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Loads the env file named on the command line, or `./.env` if present.
fn load_env(path: Option<&Path>) -> core::result::Result<(), dotenvy::Error> {
    match path {
        Some(file) => dotenvy::from_path(file),
        None => {
            let _dotenv = dotenvy::dotenv();
            Ok(())
        }
    }
}

/// Sets up mail delivery when the run is meant to send the report.
///
/// Fails with [`TagReportError::Config`] before any network traffic when
/// delivery is wanted but no relay is configured.
fn resolve_notifier(cli: &Cli, config: &ReportConfig) -> Result<Option<SmtpNotifier>> {
    if !cli.delivers() {
        return Ok(None);
    }
    let smtp = config.smtp.as_ref().ok_or_else(|| {
        TagReportError::Config(format!("{} is not set", keys::SMTP_SERVER))
    })?;
    SmtpNotifier::from_settings(smtp).map(Some)
}

/// Runs the CLI, returning an appropriate exit code.
async fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(err) = load_env(cli.env_file.as_deref()) {
        return report_error("failed to load env file", &err);
    }

    let config = match ReportConfig::from_env() {
        Ok(config) => config,
        Err(err) => return report_error("invalid configuration", &err),
    };

    let notifier = match resolve_notifier(&cli, &config) {
        Ok(notifier) => notifier,
        Err(err) => {
            let mut out = io::stderr().lock();
            writeln!(out, "{} {err}", "error:".red().bold())?;
            if config.smtp.is_none() {
                writeln!(
                    out,
                    "  {} configure SMTP or pass --preview / --output",
                    "hint:".cyan()
                )?;
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    let client = match FireflyClient::from_settings(&config.ledger) {
        Ok(client) => client,
        Err(err) => return report_error("failed to create client", &err),
    };

    let today = chrono::Local::now().date_naive();
    let window = match config.window(today) {
        Ok(window) => window,
        Err(err) => return report_error("invalid report window", &err),
    };

    let spinner = make_spinner(&format!("Building report for {window}..."));
    let result = match notifier.as_ref() {
        Some(notifier) => pipeline::run(&config, &client, notifier, today).await,
        None => generate_report(&config, &client, &window).await,
    };
    spinner.finish_and_clear();
    let report = match result {
        Ok(report) => report,
        Err(err) => return report_error("report failed", &err),
    };

    if cli.preview {
        print_totals_table(&config, &report)?;
    }

    if let Some(path) = cli.output.as_ref() {
        if let Err(err) = std::fs::write(path, &report.html) {
            return report_error(&format!("failed to write {}", path.display()), &err);
        }
        writeln!(
            io::stdout().lock(),
            "{} report written to {}",
            "done:".green().bold(),
            path.display()
        )?;
    }

    if notifier.is_some() {
        writeln!(
            io::stdout().lock(),
            "{} {}",
            "sent:".green().bold(),
            report.subject
        )?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Builds the terminal table of group, tag and summary totals.
fn totals_table(config: &ReportConfig, report: &RenderedReport) -> Table {
    let label = config.currency_label.as_str();
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Group").fg(Color::Cyan),
        Cell::new("Tag").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
    ]);

    for group in &config.tag_groups {
        for (tag, total) in report.totals.subset(&group.tags).iter() {
            _ = table.add_row(vec![
                Cell::new(&group.title),
                Cell::new(tag),
                Cell::new(format!("{label} {}", format_amount(total))),
            ]);
        }
    }
    if let Some(other) = report.totals.get(OTHER_TAG) {
        _ = table.add_row(vec![
            Cell::new(""),
            Cell::new(OTHER_TAG),
            Cell::new(format!("{label} {}", format_amount(other))),
        ]);
    }
    if let Some(summary) = report.summary.as_ref() {
        for (name, value) in summary.lines() {
            _ = table.add_row(vec![
                Cell::new("Summary").fg(Color::Green),
                Cell::new(name),
                Cell::new(format!("{label} {}", format_amount(value))),
            ]);
        }
    }
    table
}

/// Prints the totals table under the report subject.
fn print_totals_table(config: &ReportConfig, report: &RenderedReport) -> io::Result<()> {
    let table = totals_table(config, report);
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "{} {}",
        report.subject.green().bold(),
        format_args!("({})", report.window).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
