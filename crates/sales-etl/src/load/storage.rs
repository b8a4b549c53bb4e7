// Sales Storage Layer

use crate::config::DEFAULT_LOAD_CHUNK_SIZE;
use crate::load::{LoadStats, Result, SalesTable};
use sales_common::{OrderSummary, SalesRow};
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, warn};

/// PostgreSQL caps bind parameters per statement at 65535.
const MAX_BIND_PARAMS: usize = 65_535;

/// A row type that maps onto one persisted table
pub trait SalesRecord {
    const TABLE: SalesTable;
    const COLUMNS: &'static [&'static str];
    const CONFLICT_KEY: &'static [&'static str];

    /// Whether the row can satisfy the table's key constraints
    fn has_key(&self) -> bool;

    /// Natural key rendered for log lines
    fn key(&self) -> String;

    /// Bind one value per column, in `COLUMNS` order
    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>);
}

impl SalesRecord for OrderSummary {
    const TABLE: SalesTable = SalesTable::Sales;
    const COLUMNS: &'static [&'static str] = &[
        "event_date",
        "ecommerce_transaction_id",
        "user_pseudo_id",
        "event_value_in_usd",
        "item_quantity",
        "total_sales",
        "total_sales_in_usd",
    ];
    const CONFLICT_KEY: &'static [&'static str] = &["ecommerce_transaction_id"];

    fn has_key(&self) -> bool {
        self.ecommerce_transaction_id.is_some()
    }

    fn key(&self) -> String {
        self.ecommerce_transaction_id.clone().unwrap_or_default()
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.event_date)
            .push_bind(self.ecommerce_transaction_id.clone())
            .push_bind(self.user_pseudo_id.clone())
            .push_bind(self.event_value_in_usd)
            .push_bind(self.item_quantity)
            .push_bind(self.total_sales)
            .push_bind(self.total_sales_in_usd);
    }
}

impl SalesRecord for SalesRow {
    const TABLE: SalesTable = SalesTable::SalesDetail;
    const COLUMNS: &'static [&'static str] = &[
        "ecommerce_transaction_id",
        "item_id",
        "item_quantity",
        "item_price",
    ];
    const CONFLICT_KEY: &'static [&'static str] = &["ecommerce_transaction_id", "item_id"];

    fn has_key(&self) -> bool {
        self.item_id.is_some()
    }

    fn key(&self) -> String {
        format!(
            "{}/{}",
            self.ecommerce_transaction_id.as_deref().unwrap_or_default(),
            self.item_id.as_deref().unwrap_or_default()
        )
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.ecommerce_transaction_id.clone())
            .push_bind(self.item_id.clone())
            .push_bind(self.item_quantity)
            .push_bind(self.item_price);
    }
}

/// Build `INSERT ... VALUES (...), (...) ON CONFLICT (...) DO NOTHING`
fn insert_statement<'args, R: SalesRecord>(rows: &[&R]) -> QueryBuilder<'args, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        R::TABLE,
        R::COLUMNS.join(", ")
    ));

    builder.push_values(rows.iter(), |mut b, row| row.push_binds(&mut b));
    builder.push(format!(
        " ON CONFLICT ({}) DO NOTHING",
        R::CONFLICT_KEY.join(", ")
    ));

    builder
}

/// Storage handler for the sales tables
pub struct SalesStorage {
    db: PgPool,
    chunk_size: usize,
}

impl SalesStorage {
    /// Create storage handler with the default chunk size
    pub fn new(db: PgPool) -> Self {
        Self::with_chunk_size(db, DEFAULT_LOAD_CHUNK_SIZE)
    }

    /// Create storage handler with a custom chunk size
    pub fn with_chunk_size(db: PgPool, chunk_size: usize) -> Self {
        Self {
            db,
            chunk_size: chunk_size.max(1),
        }
    }

    pub async fn store_summaries(&self, rows: &[OrderSummary]) -> Result<LoadStats> {
        self.store(rows).await
    }

    pub async fn store_details(&self, rows: &[SalesRow]) -> Result<LoadStats> {
        self.store(rows).await
    }

    /// Insert rows chunk by chunk, skipping natural-key conflicts
    ///
    /// Rows without a usable key are rejected up front. A chunk that fails
    /// with a database error is replayed one row per transaction. Connection
    /// level errors abort the load.
    pub async fn store<R: SalesRecord>(&self, rows: &[R]) -> Result<LoadStats> {
        let mut stats = LoadStats::new(rows.len());

        let (keyed, unkeyed): (Vec<&R>, Vec<&R>) = rows.iter().partition(|row| row.has_key());
        stats.rejected = unkeyed.len();
        if !unkeyed.is_empty() {
            warn!(
                table = %R::TABLE,
                rows = unkeyed.len(),
                "Rejecting rows without a natural key"
            );
        }

        let chunk_size = self.chunk_size_for::<R>();
        let total_chunks = keyed.len().div_ceil(chunk_size);

        for (chunk_idx, chunk) in keyed.chunks(chunk_size).enumerate() {
            debug!(
                "Storing {} chunk {} / {} ({} rows)",
                R::TABLE,
                chunk_idx + 1,
                total_chunks,
                chunk.len()
            );

            match self.insert_chunk(chunk).await {
                Ok(inserted) => stats.record_insert(chunk.len(), inserted),
                Err(sqlx::Error::Database(e)) => {
                    warn!(
                        table = %R::TABLE,
                        chunk = chunk_idx + 1,
                        error = %e,
                        "Chunk insert failed, retrying row by row"
                    );
                    self.insert_row_by_row(chunk, &mut stats).await?;
                },
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            "Stored {} into {}: {} inserted, {} duplicates skipped, {} rejected, {} failed",
            stats.attempted,
            R::TABLE,
            stats.inserted,
            stats.skipped_conflicts,
            stats.rejected,
            stats.failed
        );

        Ok(stats)
    }

    /// Current number of rows in `table`
    pub async fn count_rows(&self, table: SalesTable) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.db).await?;
        Ok(count)
    }

    fn chunk_size_for<R: SalesRecord>(&self) -> usize {
        self.chunk_size.min(MAX_BIND_PARAMS / R::COLUMNS.len())
    }

    async fn insert_chunk<R: SalesRecord>(&self, rows: &[&R]) -> std::result::Result<u64, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let result = insert_statement(rows).build().execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn insert_row_by_row<R: SalesRecord>(
        &self,
        rows: &[&R],
        stats: &mut LoadStats,
    ) -> Result<()> {
        for row in rows {
            match self.insert_chunk(std::slice::from_ref(row)).await {
                Ok(inserted) => stats.record_insert(1, inserted),
                Err(sqlx::Error::Database(e)) => {
                    stats.failed += 1;
                    warn!(table = %R::TABLE, key = %row.key(), error = %e, "Skipping row");
                },
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
