//! Configuration loaded from the process environment

use sales_etl::config::{Config, ConfigError, DEFAULT_LOAD_CHUNK_SIZE};
use serial_test::serial;
use std::path::PathBuf;

const VARS: [&str; 9] = [
    "DATABASE_URL",
    "PG_HOST",
    "PG_PORT",
    "PG_DATABASE",
    "PG_USER",
    "PG_PASSWORD",
    "DB_CONNECT_TIMEOUT",
    "DATA_DIR",
    "LOAD_CHUNK_SIZE",
];

fn with_env(pairs: &[(&str, &str)], check: impl FnOnce()) {
    for name in VARS {
        std::env::remove_var(name);
    }
    for (name, value) in pairs {
        std::env::set_var(name, value);
    }

    check();

    for name in VARS {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_load_from_pg_variables() {
    with_env(
        &[
            ("PG_HOST", "db.internal"),
            ("PG_DATABASE", "sales"),
            ("PG_USER", "etl"),
            ("PG_PASSWORD", "secret"),
            ("DATA_DIR", "/var/lib/events"),
        ],
        || {
            let config = Config::load().unwrap();
            assert_eq!(config.database.host, "db.internal");
            assert_eq!(config.database.port, 5432);
            assert_eq!(config.pipeline.data_dir, PathBuf::from("/var/lib/events"));
            assert_eq!(config.pipeline.load_chunk_size, DEFAULT_LOAD_CHUNK_SIZE);
            assert!(!format!("{:?}", config).contains("secret"));
        },
    );
}

#[test]
#[serial]
fn test_database_url_wins() {
    with_env(
        &[
            ("DATABASE_URL", "postgres://etl@localhost:5433/sales"),
            ("LOAD_CHUNK_SIZE", "50"),
        ],
        || {
            let config = Config::load().unwrap();
            assert_eq!(config.pipeline.load_chunk_size, 50);
            assert!(config.database.connect_options().is_ok());
        },
    );
}

#[test]
#[serial]
fn test_missing_database_settings() {
    with_env(&[("PG_USER", "etl")], || {
        assert!(matches!(
            Config::load(),
            Err(ConfigError::Missing("PG_DATABASE"))
        ));
    });
}

#[test]
#[serial]
fn test_invalid_port() {
    with_env(
        &[("PG_DATABASE", "sales"), ("PG_USER", "etl"), ("PG_PORT", "not-a-port")],
        || {
            assert!(matches!(
                Config::load(),
                Err(ConfigError::Invalid { name: "PG_PORT", .. })
            ));
        },
    );
}
