mod common;

use chrono::{DateTime, TimeZone, Utc};
use common::*;
use lopdf::Document;
use pdf_despatch::*;
use serde_json::{Value, json};
use std::sync::atomic::Ordering;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()
}

fn config() -> RunConfig {
    RunConfig::new("Vivid Teas", Since::HoursBack(24).resolve(now()))
}

fn record(number: &str, reference: &str) -> Value {
    json!({
        "orderNumber": number,
        "orderKey": reference,
        "shipTo": {"name": "Ada Lovelace", "street1": "1 Analytical Way", "city": "London", "postalCode": "N1 1AA"},
        "items": [{"sku": "TEA-01", "name": "Earl Grey", "quantity": 1}],
    })
}

fn prefixed_records() -> Vec<Value> {
    vec![
        record("1", "VIV-1"),
        record("2", "JD-2"),
        record("3", "VIV-3"),
    ]
}

#[tokio::test]
async fn test_prefix_filter_keeps_two_of_three() {
    let source = FakeSource::new(prefixed_records());
    let mailer = FakeMailer::default();
    let fetcher = FakeFetcher::new();
    let mut config = config();
    config.reference_prefix = Some("VIV-".to_string());
    let ctx = JobContext {
        source: &source,
        mailer: Some(&mailer),
        now: now(),
    };

    let output = run_packsheets(&config, &ctx, &fetcher).await.unwrap();

    assert_eq!(output.summary.processed, 2);
    assert_eq!(output.summary.total, 3);
    assert_eq!(output.summary.filter, "reference prefix 'VIV-'");
    assert!(output.summary.subject.contains(": 2 orders ("));

    let doc = Document::load_mem(&output.pdf).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn test_filtered_orders_keep_original_order() {
    let orders = normalize_orders(&prefixed_records());
    let kept = filter_by_reference_prefix(orders, Some("VIV-"));
    let numbers: Vec<&str> = kept.iter().map(|o| o.order_number.as_str()).collect();
    assert_eq!(numbers, vec!["1", "3"]);
}

#[tokio::test]
async fn test_empty_packsheets_still_emails_valid_document() {
    let source = FakeSource::new(Vec::new());
    let mailer = FakeMailer::default();
    let fetcher = FakeFetcher::new();
    let ctx = JobContext {
        source: &source,
        mailer: Some(&mailer),
        now: now(),
    };

    let output = run_packsheets(&config(), &ctx, &fetcher).await.unwrap();

    let doc = Document::load_mem(&output.pdf).unwrap();
    assert_eq!(doc.get_pages().len(), 0);
    assert!(fetcher.calls().is_empty());

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].attachment, output.pdf);
    assert!(sent[0].subject.contains(": 0 orders ("));
    assert!(output.summary.emailed);
}

#[tokio::test]
async fn test_empty_report_still_emails_message_page() {
    let source = FakeSource::new(Vec::new());
    let mailer = FakeMailer::default();
    let ctx = JobContext {
        source: &source,
        mailer: Some(&mailer),
        now: now(),
    };

    let output = run_report(&config(), &ctx).await.unwrap();

    let doc = Document::load_mem(&output.pdf).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    assert_eq!(mailer.sent().len(), 1);
    assert_eq!(output.summary.kind, JobKind::Report);
}

#[tokio::test]
async fn test_report_attaches_rendered_pdf() {
    let source = FakeSource::new(prefixed_records());
    let mailer = FakeMailer::default();
    let ctx = JobContext {
        source: &source,
        mailer: Some(&mailer),
        now: now(),
    };

    let output = run_report(&config(), &ctx).await.unwrap();

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].attachment_name.ends_with(".pdf"));
    assert_eq!(sent[0].attachment, output.pdf);
    assert_eq!(output.summary.processed, 3);
    assert_eq!(output.summary.filter, "none");
}

#[tokio::test]
async fn test_packsheets_place_batch_labels() {
    let source = FakeSource::new(prefixed_records());
    let mailer = FakeMailer::default();
    let fetcher = FakeFetcher::new().serve("https://labels.test/batch.pdf", label_bytes(3));
    let mut config = config();
    config.batch_label_url = Some("https://labels.test/batch.pdf".to_string());
    let ctx = JobContext {
        source: &source,
        mailer: Some(&mailer),
        now: now(),
    };

    let output = run_packsheets(&config, &ctx, &fetcher).await.unwrap();

    assert_eq!(output.summary.label_source, Some(LabelSource::Batch));
    let stats = output.summary.compose_stats.unwrap();
    assert_eq!(stats.pages, 3);
    assert_eq!(stats.labels_placed, 3);
}

#[tokio::test]
async fn test_source_failure_aborts_without_email() {
    let source = FakeSource::failing();
    let mailer = FakeMailer::default();
    let ctx = JobContext {
        source: &source,
        mailer: Some(&mailer),
        now: now(),
    };

    let result = run_report(&config(), &ctx).await;

    assert!(matches!(result, Err(DespatchError::Source(_))));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_no_mailer_skips_delivery() {
    let source = FakeSource::new(prefixed_records());
    let ctx = JobContext {
        source: &source,
        mailer: None,
        now: now(),
    };

    let output = run_report(&config(), &ctx).await.unwrap();

    assert!(!output.summary.emailed);
    assert!(!output.pdf.is_empty());
}

#[tokio::test]
async fn test_invalid_config_rejected_before_fetch() {
    let source = FakeSource::new(prefixed_records());
    let mut config = config();
    config.geometry.panel_height_pt = 0.0;
    let ctx = JobContext {
        source: &source,
        mailer: None,
        now: now(),
    };

    let result = run_packsheets(&config, &ctx, &FakeFetcher::new()).await;

    assert!(matches!(result, Err(DespatchError::Config(_))));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}
