use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Where score records are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "STORAGE_BACKEND",
                value: value.to_string(),
            }),
        }
    }
}

/// Connection parameters for the PostgreSQL score store.
///
/// `url`, when present, wins over the individual fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5431,
            user: "postgres".to_string(),
            password: "password".to_string(),
            database: "tabist".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub async fn create_pool(&self) -> Result<PgPool, sqlx::Error> {
        let pool_options = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(5));

        match &self.url {
            Some(url) => pool_options.connect(url).await,
            None => {
                let options = PgConnectOptions::new()
                    .host(&self.host)
                    .port(self.port)
                    .username(&self.user)
                    .password(&self.password)
                    .database(&self.database);
                pool_options.connect_with(options).await
            }
        }
    }
}

/// Process-wide configuration, assembled once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            storage: StorageBackend::Postgres,
            database: DatabaseConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let db_defaults = defaults.database;

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            host: lookup("DATABASE_HOST").unwrap_or(db_defaults.host),
            port: parse_or("DATABASE_PORT", lookup("DATABASE_PORT"), db_defaults.port)?,
            user: lookup("DATABASE_USER").unwrap_or(db_defaults.user),
            password: lookup("DATABASE_PASSWORD").unwrap_or(db_defaults.password),
            database: lookup("DATABASE_NAME").unwrap_or(db_defaults.database),
            max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                lookup("DATABASE_MAX_CONNECTIONS"),
                db_defaults.max_connections,
            )?,
        };

        let storage = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => defaults.storage,
        };

        Ok(Self {
            host: lookup("APP_HOST").unwrap_or(defaults.host),
            port: parse_or("APP_PORT", lookup("APP_PORT"), defaults.port)?,
            storage,
            database,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}
