// Sales Transformation
//
// Turns the raw purchase table into the two persisted views:
// - order summary: one row per (date, transaction, user, event value) group
// - sales detail: every cleaned line item that has an item id
//
// Steps:
// 1. coerce_types: loosely typed values -> dates, decimals, text (bad -> null)
// 2. compute_derived: total_sales / total_sales_in_usd (null in, null out)
// 3. aggregate_summary: runs on ALL derived rows, including null item ids
// 4. filter_detail: drops null item ids from the detail view only
//
// Steps 3 and 4 are independent projections of the same intermediate rows.

pub mod aggregate;
pub mod coerce;

use rust_decimal::Decimal;
use sales_common::{OrderSummary, RawRecord, RawTable, SalesRow, PURCHASE_COLUMNS};
use serde_json::Value;
use tracing::{debug, info};

pub use aggregate::aggregate_summary;

/// Result type for transformation
pub type Result<T> = std::result::Result<T, TransformError>;

/// Structural errors; malformed values never surface here
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// The two transformer outputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    pub summary: Vec<OrderSummary>,
    pub detail: Vec<SalesRow>,
}

/// Transform a raw purchase table into summary and detail rows
pub fn transform(table: &RawTable) -> Result<TransformOutput> {
    let rows = compute_derived(coerce_types(table)?);

    let summary = aggregate_summary(&rows);
    let detail = filter_detail(rows);

    info!(
        "Transformed {} raw rows into {} summary rows and {} detail rows",
        table.len(),
        summary.len(),
        detail.len()
    );

    Ok(TransformOutput { summary, detail })
}

/// Ensure every purchase column is declared on the table
pub fn check_columns(table: &RawTable) -> Result<()> {
    match PURCHASE_COLUMNS.iter().find(|column| !table.has_column(column)) {
        Some(missing) => Err(TransformError::MissingField(missing.to_string())),
        None => Ok(()),
    }
}

/// Coerce every raw record into a typed row
///
/// Fails only when a required column is not declared on the table.
pub fn coerce_types(table: &RawTable) -> Result<Vec<SalesRow>> {
    check_columns(table)?;
    Ok(table.records().iter().map(coerce_record).collect())
}

fn coerce_record(record: &RawRecord) -> SalesRow {
    let field = |column: &str| record.get(column).unwrap_or(&Value::Null);

    SalesRow {
        event_date: coerce::parse_date(field("event_date")),
        event_value_in_usd: coerce::parse_money(field("event_value_in_usd")),
        user_pseudo_id: coerce::parse_text(field("user_pseudo_id")),
        ecommerce_transaction_id: coerce::parse_text(field("ecommerce_transaction_id")),
        item_id: coerce::parse_text(field("item_id")),
        item_quantity: coerce::parse_decimal(field("item_quantity")),
        item_price: coerce::parse_money(field("item_price")),
        item_price_in_usd: coerce::parse_money(field("item_price_in_usd")),
        total_sales: None,
        total_sales_in_usd: None,
    }
}

/// Set `total_sales` and `total_sales_in_usd` on every row
pub fn compute_derived(mut rows: Vec<SalesRow>) -> Vec<SalesRow> {
    for row in &mut rows {
        row.total_sales = multiply(row.item_quantity, row.item_price);
        row.total_sales_in_usd = multiply(row.item_quantity, row.item_price_in_usd);
    }
    rows
}

/// Null if either side is null; overflow also degrades to null
fn multiply(quantity: Option<Decimal>, price: Option<Decimal>) -> Option<Decimal> {
    let product = quantity?.checked_mul(price?);
    if product.is_none() {
        debug!("Decimal overflow computing line total, storing null");
    }
    product.map(|p| p.normalize())
}

/// Keep rows whose `item_id` is present
pub fn filter_detail(rows: Vec<SalesRow>) -> Vec<SalesRow> {
    rows.into_iter().filter(|row| row.item_id.is_some()).collect()
}
