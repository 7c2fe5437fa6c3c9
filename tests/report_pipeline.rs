//! End-to-end report run against a mocked Firefly III instance.

use core::time::Duration;
use std::sync::Mutex;

use chrono::NaiveDate;
use firefly_tagreport::client::FireflyClient;
use firefly_tagreport::config::{LedgerSettings, ReportConfig, ResidualMode, TagGroup};
use firefly_tagreport::error::{Result, TagReportError};
use firefly_tagreport::notify::Notifier;
use firefly_tagreport::pipeline;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Notifier that keeps every message it is asked to send.
#[derive(Debug, Default)]
struct RecordingNotifier {
    /// `(subject, html)` pairs in send order.
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_owned(), html_body.to_owned()));
        Ok(())
    }
}

fn config(base_url: &str) -> ReportConfig {
    ReportConfig {
        ledger: LedgerSettings {
            base_url: base_url.to_owned(),
            token: SecretString::from("test-token".to_owned()),
            timeout: Duration::from_secs(5),
        },
        currency_code: "ZAR".to_owned(),
        currency_label: "R".to_owned(),
        month_start: 26,
        month_end: 25,
        tag_groups: vec![
            TagGroup::new("Food", ["groceries", "dining out"]),
            TagGroup::new("Transport", ["fuel"]),
        ],
        residual_mode: ResidualMode::Exclusive,
        fetch_concurrency: 3,
        fetch_retries: 0,
        smtp: None,
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

fn page(items: &[(&str, &str, &str)]) -> serde_json::Value {
    let data: Vec<_> = items
        .iter()
        .map(|&(id, amount, kind)| {
            json!({
                "type": "transactions",
                "id": id,
                "attributes": {
                    "group_title": null,
                    "transactions": [{ "amount": amount, "type": kind, "currency_code": "ZAR" }]
                }
            })
        })
        .collect();
    json!({ "data": data, "meta": { "pagination": { "total": items.len() } } })
}

async fn mount_page(server: &MockServer, url_path: &str, items: &[(&str, &str, &str)]) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .and(query_param("start", "2024-02-26"))
        .and(query_param("end", "2024-03-25"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(items)))
        .mount(server)
        .await;
}

async fn mount_ledger(server: &MockServer, summary: serde_json::Value) {
    mount_page(
        server,
        "/api/v1/transactions",
        &[
            ("1", "150.00", "withdrawal"),
            ("2", "42.50", "withdrawal"),
            ("3", "600.00", "withdrawal"),
            ("4", "30.005", "withdrawal"),
            ("5", "9000.00", "deposit"),
        ],
    )
    .await;
    mount_page(server, "/api/v1/tags/groceries/transactions", &[("1", "150.00", "withdrawal")]).await;
    mount_page(
        server,
        "/api/v1/tags/dining%20out/transactions",
        &[("2", "42.50", "withdrawal")],
    )
    .await;
    mount_page(server, "/api/v1/tags/fuel/transactions", &[("3", "600.00", "withdrawal")]).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/summary/basic"))
        .and(query_param("start", "2024-02-26"))
        .respond_with(ResponseTemplate::new(200).set_body_json(summary))
        .mount(server)
        .await;
}

fn full_summary() -> serde_json::Value {
    json!({
        "spent-in-ZAR": { "key": "spent-in-ZAR", "monetary_value": "-822.505", "currency_code": "ZAR" },
        "earned-in-ZAR": { "key": "earned-in-ZAR", "monetary_value": "9000", "currency_code": "ZAR" },
        "net-worth-in-ZAR": { "key": "net-worth-in-ZAR", "monetary_value": 125000.25, "currency_code": "ZAR" },
        "spent-in-USD": { "key": "spent-in-USD", "monetary_value": "-1.00", "currency_code": "USD" }
    })
}

#[tokio::test]
async fn full_run_renders_and_sends_one_report() {
    let server = MockServer::start().await;
    mount_ledger(&server, full_summary()).await;

    let config = config(&server.uri());
    let client = FireflyClient::from_settings(&config.ledger).unwrap();
    let notifier = RecordingNotifier::default();

    let report = pipeline::run(&config, &client, &notifier, today()).await.unwrap();

    let sent = notifier.messages();
    assert_eq!(sent.len(), 1);
    let (subject, html) = sent.first().unwrap();
    assert_eq!(subject, "FireflyIII: Tag Report for 2024-02");
    assert_eq!(html, &report.html);

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<h1>Monthly Report for 2024-02-26 to 2024-03-25</h1>"));
    assert!(html.contains("<h2>Food</h2>"));
    assert!(html.contains("<h2>Transport</h2>"));
    assert!(html.contains("<td>dining out</td>"));
    assert!(html.contains(r#"<td class="subtotal"><b>192.50</b></td>"#));
    assert!(html.contains("<td>600.00</td>"));
    assert!(html.contains("<td>Net Worth</td>"));
    assert!(html.contains("<td>125000.25</td>"));
    assert!(html.contains("<td>-822.51</td>"));

    // Only the untagged withdrawal lands in Other.
    assert_eq!(
        report.totals.get("Other"),
        Some(rust_decimal::Decimal::new(30_005, 3))
    );
}

#[tokio::test]
async fn missing_summary_currency_still_sends_report() {
    let server = MockServer::start().await;
    mount_ledger(
        &server,
        json!({ "spent-in-USD": { "monetary_value": "-1.00" } }),
    )
    .await;

    let config = config(&server.uri());
    let client = FireflyClient::from_settings(&config.ledger).unwrap();
    let notifier = RecordingNotifier::default();

    let report = pipeline::run(&config, &client, &notifier, today()).await.unwrap();

    assert!(report.summary.is_none());
    assert_eq!(notifier.messages().len(), 1);
    assert!(report.html.contains("<td>groceries</td>"));
}

#[tokio::test]
async fn failed_tag_fetch_sends_nothing() {
    let server = MockServer::start().await;
    mount_page(&server, "/api/v1/transactions", &[("1", "10.00", "withdrawal")]).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags/groceries/transactions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    mount_page(&server, "/api/v1/tags/dining%20out/transactions", &[]).await;
    mount_page(&server, "/api/v1/tags/fuel/transactions", &[]).await;

    let config = config(&server.uri());
    let client = FireflyClient::from_settings(&config.ledger).unwrap();
    let notifier = RecordingNotifier::default();

    let err = pipeline::run(&config, &client, &notifier, today())
        .await
        .unwrap_err();

    assert!(matches!(err, TagReportError::Api { status: 500, .. }));
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn invalid_window_fails_before_any_request() {
    let server = MockServer::start().await;
    let mut config = config(&server.uri());
    config.month_start = 0;
    let client = FireflyClient::from_settings(&config.ledger).unwrap();
    let notifier = RecordingNotifier::default();

    let err = pipeline::run(&config, &client, &notifier, today())
        .await
        .unwrap_err();

    assert!(matches!(err, TagReportError::Config(_)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
