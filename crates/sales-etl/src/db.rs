use crate::config::{ConfigError, DatabaseConfig};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Schema migrations for the `sales` and `sales_detail` tables
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Connection setup errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Database configuration error: {0}. Check DATABASE_URL or PG_* settings.")]
    Config(#[from] ConfigError),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Open a single-connection pool for one pipeline run
///
/// The run is sequential, so one connection is enough. Callers close the
/// pool when they are done with it.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let options = config.connect_options()?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect_with(options)
        .await
        .map_err(DbError::Connect)?;

    info!("Database connection established");
    Ok(pool)
}

/// Apply pending migrations
pub async fn migrate(pool: &PgPool) -> Result<(), DbError> {
    MIGRATOR.run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}
