//! Extraction over real directories

use rust_decimal::Decimal;
use sales_etl::extract::{extract_sales, ExtractError};
use sales_etl::transform;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn purchase(transaction: &str, items: Value) -> Value {
    json!({
        "event_date": "20240910",
        "event_name": "purchase",
        "event_value_in_usd": 100.0,
        "user_pseudo_id": "pseudo1",
        "ecommerce": { "transaction_id": transaction },
        "items": items,
    })
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_extract_and_transform_single_purchase() {
    let dir = TempDir::new().unwrap();
    let events = json!([
        purchase(
            "trans1",
            json!([{ "item_id": "item1", "quantity": 2, "price": 50.0, "price_in_usd": 50.0 }])
        ),
        { "event_name": "page_view", "user_pseudo_id": "pseudo2" },
    ]);
    write(dir.path(), "events.json", &events.to_string());

    let extraction = extract_sales(dir.path()).unwrap();
    assert_eq!(extraction.table.len(), 1);
    assert_eq!(extraction.stats.events_seen, 2);
    assert_eq!(extraction.stats.purchase_events, 1);

    let output = transform(&extraction.table).unwrap();
    assert_eq!(output.summary.len(), 1);
    assert_eq!(output.summary[0].ecommerce_transaction_id.as_deref(), Some("trans1"));
    assert_eq!(output.summary[0].total_sales_in_usd, Some(Decimal::ONE_HUNDRED));
    assert_eq!(output.detail.len(), 1);
    assert_eq!(output.detail[0].item_id.as_deref(), Some("item1"));
}

#[test]
fn test_items_are_exploded_per_row() {
    let dir = TempDir::new().unwrap();
    let event = purchase(
        "trans1",
        json!([
            { "item_id": "item1", "quantity": 1, "price": 10.0, "price_in_usd": 10.0 },
            { "item_id": "item2", "quantity": 3, "price": 5.0, "price_in_usd": 5.0 },
        ]),
    );
    write(dir.path(), "events.json", &event.to_string());

    let extraction = extract_sales(dir.path()).unwrap();
    assert_eq!(extraction.table.len(), 2);
    assert_eq!(extraction.table.value(1, "item_id"), Some(&json!("item2")));
    assert_eq!(
        extraction.table.value(1, "ecommerce_transaction_id"),
        Some(&json!("trans1"))
    );
}

#[test]
fn test_purchase_without_items_keeps_one_row() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "events.json", &purchase("trans1", json!([])).to_string());

    let extraction = extract_sales(dir.path()).unwrap();
    assert_eq!(extraction.table.len(), 1);
    assert_eq!(extraction.table.value(0, "item_id"), None);

    let output = transform(&extraction.table).unwrap();
    assert_eq!(output.summary.len(), 1);
    assert!(output.detail.is_empty());
}

#[test]
fn test_bad_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a_broken.json", "{ not json");
    write(
        dir.path(),
        "b_good.json",
        &purchase("trans1", json!([{ "item_id": "item1", "quantity": 1, "price": 1.0 }])).to_string(),
    );

    let extraction = extract_sales(dir.path()).unwrap();
    assert_eq!(extraction.stats.files_scanned, 2);
    assert_eq!(extraction.stats.files_parsed, 1);
    assert_eq!(extraction.stats.files_skipped, 1);
    assert_eq!(extraction.table.len(), 1);
}

#[test]
fn test_only_json_files_are_read() {
    let dir = TempDir::new().unwrap();
    let content = purchase("trans1", json!([{ "item_id": "item1" }])).to_string();
    write(dir.path(), "events.txt", &content);
    write(dir.path(), "events.json.bak", &content);
    fs::create_dir(dir.path().join("nested.json")).unwrap();
    write(dir.path(), "events.json", &content);

    let extraction = extract_sales(dir.path()).unwrap();
    assert_eq!(extraction.stats.files_scanned, 1);
    assert_eq!(extraction.table.len(), 1);
}

#[test]
fn test_json_lines_file() {
    let dir = TempDir::new().unwrap();
    let lines = [
        purchase("trans1", json!([{ "item_id": "item1" }])).to_string(),
        purchase("trans2", json!([{ "item_id": "item2" }])).to_string(),
    ]
    .join("\n");
    write(dir.path(), "events.json", &lines);

    let extraction = extract_sales(dir.path()).unwrap();
    assert_eq!(extraction.stats.purchase_events, 2);
    assert_eq!(extraction.table.len(), 2);
}

#[test]
fn test_files_are_read_in_name_order() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "b.json", &purchase("trans_b", json!([{ "item_id": "b" }])).to_string());
    write(dir.path(), "a.json", &purchase("trans_a", json!([{ "item_id": "a" }])).to_string());

    let extraction = extract_sales(dir.path()).unwrap();
    assert_eq!(extraction.table.value(0, "item_id"), Some(&json!("a")));
    assert_eq!(extraction.table.value(1, "item_id"), Some(&json!("b")));
}

#[test]
fn test_no_purchase_events_is_no_data() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "events.json", r#"[{"event_name": "page_view"}]"#);
    write(dir.path(), "broken.json", "[");

    let err = extract_sales(dir.path()).unwrap_err();
    assert!(matches!(err, ExtractError::NoData { .. }));
}

#[test]
fn test_empty_directory_is_no_data() {
    let dir = TempDir::new().unwrap();

    assert!(matches!(
        extract_sales(dir.path()),
        Err(ExtractError::NoData { .. })
    ));
}

#[test]
fn test_missing_directory_is_io_error() {
    let dir = TempDir::new().unwrap();

    assert!(matches!(
        extract_sales(&dir.path().join("absent")),
        Err(ExtractError::Io { .. })
    ));
}
