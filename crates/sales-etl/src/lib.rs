//! Sales ETL Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Batch pipeline that turns e-commerce purchase event logs into two
//! PostgreSQL tables: an order-level summary (`sales`) and a line-item detail
//! view (`sales_detail`).
//!
//! # Stages
//!
//! - **extract**: scan a directory of event files, keep `purchase` events,
//!   flatten them to one raw row per line item
//! - **transform**: coerce types, compute line totals, aggregate orders
//! - **load**: batched inserts that skip natural-key duplicates
//!
//! # Example
//!
//! ```no_run
//! use sales_etl::config::Config;
//! use sales_etl::pipeline::{self, RunOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let report = pipeline::run(&config, &RunOptions::default()).await?;
//!     println!("sales rows: {}", report.table_counts.sales);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod transform;

pub use transform::{transform, TransformError, TransformOutput};
