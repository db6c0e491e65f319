//! Engine configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                      | Default    |
//! |-------------------------------|------------|
//! | `ERP_DATABASE_PATH`           | `./erp.db` |
//! | `ERP_DB_MAX_CONNECTIONS`      | `5`        |
//! | `ERP_DB_MIN_CONNECTIONS`      | `1`        |
//! | `ERP_DB_CONNECT_TIMEOUT_SECS` | `30`       |
//! | `ERP_RUN_MIGRATIONS`          | `true`     |
//! | `ERP_ALLOW_NEGATIVE_STOCK`    | `true`     |
//! | `ERP_MAX_LINE_ITEMS`          | `100`      |
//! | `ERP_LOG_FORMAT`              | `compact`  |
//!
//! `RUST_LOG` is read by [`crate::telemetry`], not here.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use erp_core::{StockPolicy, MAX_LINE_ITEMS};

use crate::pool::DbConfig;
use crate::service::EngineSettings;

/// Log output style for [`crate::telemetry::init_tracing`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(ConfigError::InvalidValue("ERP_LOG_FORMAT".to_string())),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    pub max_connections: u32,

    pub min_connections: u32,

    pub connect_timeout_secs: u64,

    /// Apply pending migrations on connect
    pub run_migrations: bool,

    /// Let sales drive product quantity below zero
    pub allow_negative_stock: bool,

    /// Lines allowed per document (1..=100)
    pub max_line_items: usize,

    pub log_format: LogFormat,
}

impl Default for ErpConfig {
    fn default() -> Self {
        ErpConfig {
            database_path: PathBuf::from("./erp.db"),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 30,
            run_migrations: true,
            allow_negative_stock: true,
            max_line_items: MAX_LINE_ITEMS,
            log_format: LogFormat::Compact,
        }
    }
}

impl ErpConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    pub fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ErpConfig::default();

        let config = ErpConfig {
            database_path: lookup("ERP_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(&lookup, "ERP_DB_MAX_CONNECTIONS", defaults.max_connections)?,

            min_connections: parse_or(&lookup, "ERP_DB_MIN_CONNECTIONS", defaults.min_connections)?,

            connect_timeout_secs: parse_or(
                &lookup,
                "ERP_DB_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,

            run_migrations: parse_or(&lookup, "ERP_RUN_MIGRATIONS", defaults.run_migrations)?,

            allow_negative_stock: parse_or(
                &lookup,
                "ERP_ALLOW_NEGATIVE_STOCK",
                defaults.allow_negative_stock,
            )?,

            max_line_items: parse_or(&lookup, "ERP_MAX_LINE_ITEMS", defaults.max_line_items)?,

            log_format: match lookup("ERP_LOG_FORMAT") {
                Some(raw) => raw.parse()?,
                None => defaults.log_format,
            },
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("ERP_DB_MAX_CONNECTIONS".to_string()));
        }

        if config.min_connections > config.max_connections {
            return Err(ConfigError::MinAboveMax {
                min: config.min_connections,
                max: config.max_connections,
            });
        }

        if !(1..=MAX_LINE_ITEMS).contains(&config.max_line_items) {
            return Err(ConfigError::InvalidValue("ERP_MAX_LINE_ITEMS".to_string()));
        }

        Ok(config)
    }

    /// Pool settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .run_migrations(self.run_migrations)
    }

    /// Business settings handed to the services.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_line_items: self.max_line_items,
            stock_policy: StockPolicy::from_allow_negative(self.allow_negative_stock),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("ERP_DB_MIN_CONNECTIONS ({min}) exceeds ERP_DB_MAX_CONNECTIONS ({max})")]
    MinAboveMax { min: u32, max: u32 },
}
