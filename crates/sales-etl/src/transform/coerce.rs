//! Permissive field coercion
//!
//! Every parser here maps a loosely typed JSON value to a strong type and
//! returns `None` when it cannot. None of them fail.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

/// Decimal places kept for monetary fields.
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Monetary rounding: half away from zero, so 10.005 -> 10.01.
pub const MONEY_ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a calendar date
///
/// Accepts `YYYY-MM-DD`, `YYYYMMDD` (string or integer), `YYYY/MM/DD`,
/// RFC 3339 timestamps and naive `YYYY-MM-DD[ T]HH:MM:SS` timestamps. The
/// time part of a timestamp is dropped.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) if n.is_u64() => parse_date_str(&n.to_string()),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a decimal number from a JSON number or a numeric string
///
/// Plain and scientific notation are accepted; surrounding whitespace is
/// ignored. Booleans, objects, arrays and empty strings are not numbers.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Number(n) => decimal_from_str(&n.to_string()),
        Value::String(s) => decimal_from_str(s.trim()),
        _ => None,
    };

    parsed.map(|d| d.normalize())
}

/// Parse a monetary amount, rounded to two decimal places
pub fn parse_money(value: &Value) -> Option<Decimal> {
    parse_decimal(value).map(round_money)
}

/// Round to two decimal places, half away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount
        .round_dp_with_strategy(MONEY_DECIMAL_PLACES, MONEY_ROUNDING)
        .normalize()
}

fn decimal_from_str(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }

    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

/// Coerce an identifier to text
///
/// Strings pass through unchanged, other scalars use their JSON text. Null
/// stays null rather than becoming the string "null".
pub fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
