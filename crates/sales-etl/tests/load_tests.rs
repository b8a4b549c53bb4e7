//! Loading against a live PostgreSQL
//!
//! Run with `DATABASE_URL` pointing at a scratch server:
//!
//! ```bash
//! cargo test -p sales-etl --test load_tests -- --ignored
//! ```

use rust_decimal::Decimal;
use sales_common::{OrderSummary, SalesRow};
use sales_etl::load::{LoadError, SalesStorage, SalesTable};
use sqlx::PgPool;

type TestResult = Result<(), LoadError>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sales_etl=debug")
        .with_test_writer()
        .try_init();
}

fn summary(transaction: Option<&str>, total: i64) -> OrderSummary {
    OrderSummary {
        event_date: chrono::NaiveDate::from_ymd_opt(2024, 9, 10),
        ecommerce_transaction_id: transaction.map(String::from),
        user_pseudo_id: Some("pseudo1".to_string()),
        event_value_in_usd: Some(Decimal::from(total)),
        item_quantity: Some(Decimal::ONE),
        total_sales: Some(Decimal::from(total)),
        total_sales_in_usd: Some(Decimal::from(total)),
    }
}

fn detail(transaction: &str, item: &str) -> SalesRow {
    SalesRow {
        ecommerce_transaction_id: Some(transaction.to_string()),
        item_id: Some(item.to_string()),
        item_quantity: Some(Decimal::TWO),
        item_price: Some(Decimal::new(5000, 2)),
        ..Default::default()
    }
}

#[sqlx::test(migrator = "sales_etl::db::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_store_summaries(pool: PgPool) -> TestResult {
    init_tracing();
    let storage = SalesStorage::new(pool);

    let stats = storage
        .store_summaries(&[summary(Some("trans1"), 100), summary(Some("trans2"), 40)])
        .await?;

    assert_eq!(stats.inserted, 2);
    assert!(stats.is_clean());
    assert_eq!(storage.count_rows(SalesTable::Sales).await?, 2);

    Ok(())
}

#[sqlx::test(migrator = "sales_etl::db::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_rerun_skips_existing_keys(pool: PgPool) -> TestResult {
    init_tracing();
    let storage = SalesStorage::new(pool);
    let rows = [detail("trans1", "item1"), detail("trans1", "item2")];

    let first = storage.store_details(&rows).await?;
    let second = storage.store_details(&rows).await?;

    assert_eq!(first.inserted, 2);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped_conflicts, 2);
    assert_eq!(storage.count_rows(SalesTable::SalesDetail).await?, 2);

    Ok(())
}

#[sqlx::test(migrator = "sales_etl::db::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicates_inside_one_chunk(pool: PgPool) -> TestResult {
    init_tracing();
    let storage = SalesStorage::with_chunk_size(pool, 10);

    let stats = storage
        .store_summaries(&[summary(Some("trans1"), 100), summary(Some("trans1"), 100)])
        .await?;

    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.skipped_conflicts, 1);

    Ok(())
}

#[sqlx::test(migrator = "sales_etl::db::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_rows_without_key_are_rejected(pool: PgPool) -> TestResult {
    init_tracing();
    let storage = SalesStorage::with_chunk_size(pool, 1);

    let stats = storage
        .store_summaries(&[summary(None, 10), summary(Some("trans1"), 10), summary(Some("trans2"), 20)])
        .await?;

    assert_eq!(stats.attempted, 3);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.inserted, 2);
    assert!(!stats.is_clean());

    Ok(())
}

#[sqlx::test(migrator = "sales_etl::db::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_failing_row_does_not_sink_its_chunk(pool: PgPool) -> TestResult {
    init_tracing();
    let storage = SalesStorage::new(pool);

    // NUMERIC(14, 2) overflows on this value
    let mut oversized = summary(Some("trans2"), 0);
    oversized.event_value_in_usd = Some(Decimal::from(10_i64.pow(15)));

    let stats = storage
        .store_summaries(&[summary(Some("trans1"), 10), oversized, summary(Some("trans3"), 30)])
        .await?;

    assert_eq!(stats.inserted, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(storage.count_rows(SalesTable::Sales).await?, 2);

    Ok(())
}
