// Sales Pipeline Orchestration
//
// extract -> transform -> load, strictly in that order, then report the
// persisted row counts. The database pool lives only for the load phase and
// is closed on every exit path.
//
// Failures come back as a typed error so the binary can log them once and
// pick an exit status; nothing here swallows errors.

use crate::config::Config;
use crate::db::{self, DbError};
use crate::extract::{extract_sales, ExtractError, ExtractStats, Extraction};
use crate::load::{LoadError, LoadStats, SalesStorage, SalesTable};
use crate::transform::{transform, TransformError, TransformOutput};
use serde::Serialize;
use sqlx::PgPool;
use std::process::ExitCode;
use thiserror::Error;
use tracing::info;

/// Result type for pipeline runs
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline errors, one variant per stage
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl PipelineError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            PipelineError::Extract(ExtractError::NoData { .. }) => ExitStatus::NoWork,
            _ => ExitStatus::Failure,
        }
    }
}

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Success,
    /// Fatal error: configuration, connection, structural or I/O
    Failure,
    /// The run finished but some rows were rejected or failed to load
    PartialFailure,
    /// No purchase data was found, nothing was loaded
    NoWork,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::PartialFailure => 2,
            ExitStatus::NoWork => 3,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Options for a single run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub run_migrations: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_migrations: true,
        }
    }
}

/// Row counts of the persisted tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub sales: i64,
    pub sales_detail: i64,
}

/// Everything a run did
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub extract: ExtractStats,
    pub summary_rows: usize,
    pub detail_rows: usize,
    pub sales: LoadStats,
    pub sales_detail: LoadStats,
    pub table_counts: TableCounts,
}

impl PipelineReport {
    pub fn exit_status(&self) -> ExitStatus {
        if self.sales.is_clean() && self.sales_detail.is_clean() {
            ExitStatus::Success
        } else {
            ExitStatus::PartialFailure
        }
    }
}

/// Run the full pipeline once
pub async fn run(config: &Config, options: &RunOptions) -> Result<PipelineReport> {
    info!("Starting sales ETL pipeline");

    info!("Step 1/3: Extracting from {}", config.pipeline.data_dir.display());
    let Extraction {
        table,
        stats: extract,
    } = extract_sales(&config.pipeline.data_dir)?;

    info!("Step 2/3: Transforming {} raw rows", table.len());
    let output = transform(&table)?;

    info!("Step 3/3: Loading into database");
    let pool = db::connect(&config.database).await?;
    let loaded = load(&pool, config, options, &output).await;
    pool.close().await;
    let (sales, sales_detail, table_counts) = loaded?;

    let report = PipelineReport {
        extract,
        summary_rows: output.summary.len(),
        detail_rows: output.detail.len(),
        sales,
        sales_detail,
        table_counts,
    };

    info!(
        status = ?report.exit_status(),
        sales = report.table_counts.sales,
        sales_detail = report.table_counts.sales_detail,
        "Pipeline completed"
    );

    Ok(report)
}

async fn load(
    pool: &PgPool,
    config: &Config,
    options: &RunOptions,
    output: &TransformOutput,
) -> Result<(LoadStats, LoadStats, TableCounts)> {
    if options.run_migrations {
        db::migrate(pool).await?;
    }

    let storage = SalesStorage::with_chunk_size(pool.clone(), config.pipeline.load_chunk_size);
    let sales = storage.store_summaries(&output.summary).await?;
    let sales_detail = storage.store_details(&output.detail).await?;
    let counts = table_counts(&storage).await?;

    Ok((sales, sales_detail, counts))
}

async fn table_counts(storage: &SalesStorage) -> Result<TableCounts> {
    Ok(TableCounts {
        sales: storage.count_rows(SalesTable::Sales).await?,
        sales_detail: storage.count_rows(SalesTable::SalesDetail).await?,
    })
}

/// Apply migrations without running the pipeline
pub async fn migrate(config: &Config) -> Result<()> {
    let pool = db::connect(&config.database).await?;
    let result = db::migrate(&pool).await;
    pool.close().await;
    Ok(result?)
}

/// Current row counts of both tables
pub async fn count_tables(config: &Config) -> Result<TableCounts> {
    let pool = db::connect(&config.database).await?;
    let counts = table_counts(&SalesStorage::new(pool.clone())).await;
    pool.close().await;
    counts
}
