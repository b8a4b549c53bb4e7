//! Order-level aggregation

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sales_common::{OrderSummary, SalesRow};
use std::collections::BTreeMap;

/// Grouping key: (event_date, transaction, user, event value). Null is a
/// valid component and forms its own group.
type GroupKey = (
    Option<NaiveDate>,
    Option<String>,
    Option<String>,
    Option<Decimal>,
);

/// Running sum that skips nulls
///
/// A sum that never saw a value finishes as null, as does one that
/// overflowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NullableSum {
    #[default]
    Empty,
    Value(Decimal),
    Overflow,
}

impl NullableSum {
    pub fn add(self, value: Option<Decimal>) -> Self {
        match (self, value) {
            (sum, None) => sum,
            (NullableSum::Empty, Some(v)) => NullableSum::Value(v),
            (NullableSum::Value(acc), Some(v)) => {
                acc.checked_add(v).map_or(NullableSum::Overflow, NullableSum::Value)
            },
            (NullableSum::Overflow, Some(_)) => NullableSum::Overflow,
        }
    }

    pub fn finish(self) -> Option<Decimal> {
        match self {
            NullableSum::Value(v) => Some(v.normalize()),
            NullableSum::Empty | NullableSum::Overflow => None,
        }
    }
}

#[derive(Debug, Default)]
struct GroupTotals {
    item_quantity: NullableSum,
    total_sales: NullableSum,
    total_sales_in_usd: NullableSum,
}

/// Group rows by (date, transaction, user, event value) and sum quantities and sales
///
/// Output is sorted by group key.
pub fn aggregate_summary(rows: &[SalesRow]) -> Vec<OrderSummary> {
    let mut groups: BTreeMap<GroupKey, GroupTotals> = BTreeMap::new();

    for row in rows {
        let key = (
            row.event_date,
            row.ecommerce_transaction_id.clone(),
            row.user_pseudo_id.clone(),
            row.event_value_in_usd,
        );

        let totals = groups.entry(key).or_default();
        totals.item_quantity = totals.item_quantity.add(row.item_quantity);
        totals.total_sales = totals.total_sales.add(row.total_sales);
        totals.total_sales_in_usd = totals.total_sales_in_usd.add(row.total_sales_in_usd);
    }

    groups
        .into_iter()
        .map(
            |((event_date, ecommerce_transaction_id, user_pseudo_id, event_value_in_usd), totals)| {
                OrderSummary {
                    event_date,
                    ecommerce_transaction_id,
                    user_pseudo_id,
                    event_value_in_usd,
                    item_quantity: totals.item_quantity.finish(),
                    total_sales: totals.total_sales.finish(),
                    total_sales_in_usd: totals.total_sales_in_usd.finish(),
                }
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_sum_skips_nulls() {
        let sum = NullableSum::default()
            .add(None)
            .add(Some(Decimal::new(15, 1)))
            .add(None)
            .add(Some(Decimal::new(25, 1)));

        assert_eq!(sum.finish(), Some(Decimal::new(4, 0)));
    }

    #[test]
    fn test_nullable_sum_all_null_is_null() {
        let sum = NullableSum::default().add(None).add(None);
        assert_eq!(sum.finish(), None);
    }

    #[test]
    fn test_nullable_sum_overflow_is_null() {
        let sum = NullableSum::default()
            .add(Some(Decimal::MAX))
            .add(Some(Decimal::MAX))
            .add(Some(Decimal::ONE));

        assert_eq!(sum, NullableSum::Overflow);
        assert_eq!(sum.finish(), None);
    }

    #[test]
    fn test_null_key_components_form_their_own_group() {
        let rows = vec![
            SalesRow {
                ecommerce_transaction_id: Some("t1".to_string()),
                item_quantity: Some(Decimal::ONE),
                ..Default::default()
            },
            SalesRow {
                ecommerce_transaction_id: Some("t1".to_string()),
                item_quantity: Some(Decimal::TWO),
                ..Default::default()
            },
            SalesRow {
                item_quantity: Some(Decimal::TEN),
                ..Default::default()
            },
        ];

        let summary = aggregate_summary(&rows);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].ecommerce_transaction_id, None);
        assert_eq!(summary[0].item_quantity, Some(Decimal::TEN));
        assert_eq!(summary[1].ecommerce_transaction_id.as_deref(), Some("t1"));
        assert_eq!(summary[1].item_quantity, Some(Decimal::new(3, 0)));
        assert_eq!(summary[1].total_sales, None);
    }
}
