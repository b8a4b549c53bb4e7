//! Configuration management
//!
//! Configuration is read once at startup (from `.env` and the process
//! environment) and passed by reference to the pipeline. Nothing below the
//! binary looks up environment variables on its own.

use sqlx::postgres::PgConnectOptions;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Defaults
// ============================================================================

/// Default database host.
pub const DEFAULT_PG_HOST: &str = "localhost";

/// Default database port.
pub const DEFAULT_PG_PORT: u16 = 5432;

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default input directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default number of rows per multi-row insert.
pub const DEFAULT_LOAD_CHUNK_SIZE: usize = 500;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("Invalid DATABASE_URL: {0}")]
    DatabaseUrl(#[source] sqlx::Error),

    #[error("{0}")]
    Validation(String),
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub pipeline: PipelineConfig,
}

/// Database connection settings
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual parts
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_secs: u64,
}

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub load_chunk_size: usize,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    /// Connection options for sqlx
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        if let Some(ref url) = self.url {
            return url.parse().map_err(ConfigError::DatabaseUrl);
        }

        let database = self.database.as_deref().ok_or(ConfigError::Missing("PG_DATABASE"))?;
        let user = self.user.as_deref().ok_or(ConfigError::Missing("PG_USER"))?;

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(database)
            .username(user);

        if let Some(ref password) = self.password {
            options = options.password(password);
        }

        Ok(options)
    }
}

impl Config {
    /// Load configuration from `.env` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        Ok(Config {
            database: DatabaseConfig {
                url: non_empty("DATABASE_URL"),
                host: non_empty("PG_HOST").unwrap_or_else(|| DEFAULT_PG_HOST.to_string()),
                port: parse_or("PG_PORT", non_empty("PG_PORT"), DEFAULT_PG_PORT)?,
                database: non_empty("PG_DATABASE"),
                user: non_empty("PG_USER"),
                password: var("PG_PASSWORD"),
                connect_timeout_secs: parse_or(
                    "DB_CONNECT_TIMEOUT",
                    non_empty("DB_CONNECT_TIMEOUT"),
                    DEFAULT_CONNECT_TIMEOUT_SECS,
                )?,
            },
            pipeline: PipelineConfig {
                data_dir: non_empty("DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
                load_chunk_size: parse_or(
                    "LOAD_CHUNK_SIZE",
                    non_empty("LOAD_CHUNK_SIZE"),
                    DEFAULT_LOAD_CHUNK_SIZE,
                )?,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("Data directory cannot be empty".to_string()));
        }

        if self.pipeline.load_chunk_size == 0 {
            return Err(ConfigError::Validation(
                "LOAD_CHUNK_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.database.port == 0 {
            return Err(ConfigError::Validation("PG_PORT must be greater than 0".to_string()));
        }

        self.database.connect_options()?;

        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
