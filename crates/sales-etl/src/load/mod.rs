// Sales Loading
//
// Persists the transformer outputs into PostgreSQL:
// - `sales`: order summaries, natural key ecommerce_transaction_id
// - `sales_detail`: line items, natural key (ecommerce_transaction_id, item_id)
//
// Rows go in as multi-row INSERT ... ON CONFLICT DO NOTHING statements, one
// transaction per chunk. Duplicate natural keys are skipped and counted. If a
// chunk fails on a database error it is rolled back and replayed row by row
// so one bad row cannot take the rest of the chunk with it.

pub mod storage;

use serde::Serialize;
use thiserror::Error;

pub use storage::{SalesRecord, SalesStorage};

/// Result type for loading
pub type Result<T> = std::result::Result<T, LoadError>;

/// Loader errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persisted tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesTable {
    Sales,
    SalesDetail,
}

impl SalesTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesTable::Sales => "sales",
            SalesTable::SalesDetail => "sales_detail",
        }
    }
}

impl std::fmt::Display for SalesTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of loading one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Rows handed to the loader
    pub attempted: usize,
    pub inserted: usize,
    /// Rows whose natural key already existed
    pub skipped_conflicts: usize,
    /// Rows that cannot satisfy the natural key (null key column)
    pub rejected: usize,
    /// Rows the database refused for any other reason
    pub failed: usize,
}

impl LoadStats {
    pub fn new(attempted: usize) -> Self {
        Self {
            attempted,
            ..Default::default()
        }
    }

    /// Record an insert of `rows` rows of which `inserted` were new
    fn record_insert(&mut self, rows: usize, inserted: u64) {
        let inserted = usize::try_from(inserted).unwrap_or(rows).min(rows);
        self.inserted += inserted;
        self.skipped_conflicts += rows - inserted;
    }

    /// No row was rejected or failed
    pub fn is_clean(&self) -> bool {
        self.rejected == 0 && self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_insert_counts_conflicts() {
        let mut stats = LoadStats::new(10);
        stats.record_insert(6, 4);
        stats.record_insert(4, 4);

        assert_eq!(stats.inserted, 8);
        assert_eq!(stats.skipped_conflicts, 2);
        assert!(stats.is_clean());
    }

    #[test]
    fn test_rejected_rows_make_stats_unclean() {
        let stats = LoadStats {
            attempted: 3,
            inserted: 2,
            rejected: 1,
            ..Default::default()
        };
        assert!(!stats.is_clean());
    }

    #[test]
    fn test_table_names() {
        assert_eq!(SalesTable::Sales.to_string(), "sales");
        assert_eq!(SalesTable::SalesDetail.as_str(), "sales_detail");
    }
}
