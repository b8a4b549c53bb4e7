//! Common types passed between pipeline stages

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Columns every purchase table must declare before it can be transformed.
pub const PURCHASE_COLUMNS: [&str; 8] = [
    "event_date",
    "event_value_in_usd",
    "user_pseudo_id",
    "ecommerce_transaction_id",
    "item_id",
    "item_quantity",
    "item_price",
    "item_price_in_usd",
];

/// One loosely typed row: column name to JSON scalar.
pub type RawRecord = Map<String, Value>;

// ============================================================================
// Raw Table
// ============================================================================

/// Column-declared table of raw purchase rows.
///
/// The declared column set is tracked separately from the records so that a
/// table can be empty and still carry its shape. A declared column missing
/// from a single record reads as null; an undeclared column is a structural
/// problem for whoever consumes the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    columns: BTreeSet<String>,
    records: Vec<RawRecord>,
}

impl RawTable {
    /// Create an empty table declaring the given columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            records: Vec::new(),
        }
    }

    /// Create an empty table declaring the standard purchase columns
    pub fn purchase() -> Self {
        Self::new(PURCHASE_COLUMNS)
    }

    /// Append a record, declaring any column it introduces
    pub fn push(&mut self, record: RawRecord) {
        for key in record.keys() {
            if !self.columns.contains(key) {
                self.columns.insert(key.clone());
            }
        }
        self.records.push(record);
    }

    /// Append every record of `other`, merging its declared columns
    pub fn append(&mut self, other: RawTable) {
        self.columns.extend(other.columns);
        self.records.extend(other.records);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Value of `column` in record `index`; absent and JSON null both read as `None`
    pub fn value(&self, index: usize, column: &str) -> Option<&Value> {
        self.records
            .get(index)
            .and_then(|record| record.get(column))
            .filter(|value| !value.is_null())
    }
}

impl FromIterator<RawRecord> for RawTable {
    fn from_iter<T: IntoIterator<Item = RawRecord>>(iter: T) -> Self {
        let mut table = RawTable::default();
        for record in iter {
            table.push(record);
        }
        table
    }
}

// ============================================================================
// Typed Rows
// ============================================================================

/// A purchase row after coercion and derived-field computation.
///
/// Every field is optional: coercion degrades malformed input to `None`
/// instead of failing the row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SalesRow {
    pub event_date: Option<NaiveDate>,
    pub event_value_in_usd: Option<Decimal>,
    pub user_pseudo_id: Option<String>,
    pub ecommerce_transaction_id: Option<String>,
    pub item_id: Option<String>,
    pub item_quantity: Option<Decimal>,
    pub item_price: Option<Decimal>,
    pub item_price_in_usd: Option<Decimal>,
    pub total_sales: Option<Decimal>,
    pub total_sales_in_usd: Option<Decimal>,
}

/// Aggregated totals for one (date, transaction, user, event value) group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderSummary {
    pub event_date: Option<NaiveDate>,
    pub ecommerce_transaction_id: Option<String>,
    pub user_pseudo_id: Option<String>,
    pub event_value_in_usd: Option<Decimal>,
    pub item_quantity: Option<Decimal>,
    pub total_sales: Option<Decimal>,
    pub total_sales_in_usd: Option<Decimal>,
}
