//! Event flattening
//!
//! Turns one nested purchase event into flat raw rows: nested objects are
//! joined with `_` and the `items` list is exploded to one row per item.

use sales_common::RawRecord;
use serde_json::{Map, Value};

/// Separator used when joining nested object keys.
pub const SEPARATOR: &str = "_";

/// Event field holding the line items.
const ITEMS_FIELD: &str = "items";

/// Event-level columns copied onto every exploded row.
const EVENT_COLUMNS: [&str; 4] = [
    "event_date",
    "event_value_in_usd",
    "user_pseudo_id",
    "ecommerce_transaction_id",
];

/// Item field -> raw row column.
const ITEM_COLUMNS: [(&str, &str); 4] = [
    ("item_id", "item_id"),
    ("quantity", "item_quantity"),
    ("price", "item_price"),
    ("price_in_usd", "item_price_in_usd"),
];

/// Flatten nested objects of `object` into `out`, prefixing keys with `prefix`
///
/// Arrays and scalars are copied as-is. Empty objects are kept as values so
/// the key is not silently lost.
pub fn flatten_into(prefix: &str, object: &Map<String, Value>, out: &mut Map<String, Value>) {
    for (key, value) in object {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}{}{}", prefix, SEPARATOR, key)
        };

        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(&name, inner, out),
            other => {
                out.insert(name, other.clone());
            },
        }
    }
}

/// Whether the event's `event_name` is `purchase`
pub fn is_purchase(event: &Map<String, Value>) -> bool {
    event.get("event_name").and_then(Value::as_str) == Some("purchase")
}

/// Explode one purchase event into raw rows
///
/// Always yields at least one row: a purchase with no usable items becomes a
/// single row whose item columns are null.
pub fn purchase_rows(event: &Map<String, Value>) -> Vec<RawRecord> {
    let mut fields = event.clone();
    fields.remove(ITEMS_FIELD);

    let mut header = Map::new();
    flatten_into("", &fields, &mut header);

    let base: RawRecord = EVENT_COLUMNS
        .iter()
        .map(|column| {
            let value = header.get(*column).cloned().unwrap_or(Value::Null);
            (column.to_string(), value)
        })
        .collect();

    let items: &[Value] = match event.get(ITEMS_FIELD) {
        Some(Value::Array(items)) => items,
        _ => &[],
    };

    if items.is_empty() {
        return vec![with_item(&base, None)];
    }

    items
        .iter()
        .map(|item| match item {
            Value::Object(fields) => {
                let mut flat = Map::new();
                flatten_into("", fields, &mut flat);
                with_item(&base, Some(&flat))
            },
            _ => with_item(&base, None),
        })
        .collect()
}

fn with_item(base: &RawRecord, item: Option<&Map<String, Value>>) -> RawRecord {
    let mut row = base.clone();
    for (source, column) in ITEM_COLUMNS {
        let value = item
            .and_then(|fields| fields.get(source))
            .cloned()
            .unwrap_or(Value::Null);
        row.insert(column.to_string(), value);
    }
    row
}
