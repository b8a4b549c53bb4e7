//! Sales ETL Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types and logging setup for the sales ETL workspace.
//!
//! - **Types**: the raw purchase table handed from extract to transform, and
//!   the typed rows the transformer produces for the loader
//! - **Logging**: `tracing` subscriber configuration used by every binary
//!
//! # Example
//!
//! ```no_run
//! use sales_common::logging::{init_logging, LogConfig};
//! use sales_common::types::RawTable;
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     let table = RawTable::purchase();
//!     assert!(table.is_empty());
//!     Ok(())
//! }
//! ```

pub mod logging;
pub mod types;

pub use types::{OrderSummary, RawRecord, RawTable, SalesRow, PURCHASE_COLUMNS};
