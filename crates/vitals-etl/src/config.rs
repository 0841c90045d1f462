//! Configuration management
//!
//! Credentials come from the environment (optionally via a `.env` file); host and
//! port default to the deployment constants below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;
use vitals_common::{Result, VitalsError};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Database host inside the deployment network.
pub const DEFAULT_DB_HOST: &str = "postgres";

/// Database port inside the deployment network.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default connection timeout in seconds.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Base directory of the year/month partition tree.
pub const DEFAULT_HEALTH_DATA_DIR: &str = "health_data";

/// Patient reference file.
pub const DEFAULT_PATIENT_FILE: &str = "data/patients.csv";

/// ETL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    pub database: DatabaseConfig,
    pub paths: PathConfig,
    /// Keep a staging artifact on disk when its bulk load fails
    pub keep_failed_staging: bool,
}

/// Store connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
    pub connect_timeout_secs: u64,
}

/// Source data locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub health_data_dir: PathBuf,
    pub patient_file: PathBuf,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    /// Connection options for sqlx; the password never passes through a URL.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .application_name("vitals-etl")
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl EtlConfig {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from the process environment only
    pub fn from_env() -> Result<Self> {
        let config = EtlConfig {
            database: DatabaseConfig {
                user: std::env::var("POSTGRES_USER")
                    .map_err(|_| VitalsError::Config("POSTGRES_USER not set".to_string()))?,
                password: env_or("POSTGRES_PASSWORD", ""),
                database: std::env::var("POSTGRES_DB")
                    .map_err(|_| VitalsError::Config("POSTGRES_DB not set".to_string()))?,
                host: env_or("POSTGRES_HOST", DEFAULT_DB_HOST),
                port: env_parse("POSTGRES_PORT", DEFAULT_DB_PORT),
                connect_timeout_secs: env_parse(
                    "DB_CONNECT_TIMEOUT",
                    DEFAULT_DB_CONNECT_TIMEOUT_SECS,
                ),
            },
            paths: PathConfig {
                health_data_dir: PathBuf::from(env_or(
                    "VITALS_HEALTH_DATA_DIR",
                    DEFAULT_HEALTH_DATA_DIR,
                )),
                patient_file: PathBuf::from(env_or("VITALS_PATIENT_FILE", DEFAULT_PATIENT_FILE)),
            },
            keep_failed_staging: env_parse("VITALS_KEEP_FAILED_STAGING", true),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.user.trim().is_empty() {
            return Err(VitalsError::Config("POSTGRES_USER cannot be empty".to_string()));
        }

        if self.database.database.trim().is_empty() {
            return Err(VitalsError::Config("POSTGRES_DB cannot be empty".to_string()));
        }

        if self.database.port == 0 {
            return Err(VitalsError::Config(
                "Database port must be greater than 0".to_string(),
            ));
        }

        if self.database.password.is_empty() {
            tracing::warn!("POSTGRES_PASSWORD is empty - relying on trust or peer authentication");
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 8] = [
        "POSTGRES_USER",
        "POSTGRES_PASSWORD",
        "POSTGRES_DB",
        "POSTGRES_HOST",
        "POSTGRES_PORT",
        "VITALS_HEALTH_DATA_DIR",
        "VITALS_PATIENT_FILE",
        "VITALS_KEEP_FAILED_STAGING",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults_from_env() {
        clear_env();
        std::env::set_var("POSTGRES_USER", "etl");
        std::env::set_var("POSTGRES_PASSWORD", "s3cr3t");
        std::env::set_var("POSTGRES_DB", "health");

        let config = EtlConfig::from_env().unwrap();
        assert_eq!(config.database.host, DEFAULT_DB_HOST);
        assert_eq!(config.database.port, DEFAULT_DB_PORT);
        assert_eq!(config.paths.health_data_dir, PathBuf::from("health_data"));
        assert_eq!(config.paths.patient_file, PathBuf::from("data/patients.csv"));
        assert!(config.keep_failed_staging);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_overrides() {
        clear_env();
        std::env::set_var("POSTGRES_USER", "etl");
        std::env::set_var("POSTGRES_DB", "health");
        std::env::set_var("POSTGRES_PORT", "6543");
        std::env::set_var("VITALS_KEEP_FAILED_STAGING", "false");

        let config = EtlConfig::from_env().unwrap();
        assert_eq!(config.database.port, 6543);
        assert!(!config.keep_failed_staging);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_missing_user() {
        clear_env();
        std::env::set_var("POSTGRES_DB", "health");

        let result = EtlConfig::from_env();
        assert!(matches!(result, Err(VitalsError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_debug_redacts_password() {
        let db = DatabaseConfig {
            user: "etl".to_string(),
            password: "hunter2".to_string(),
            database: "health".to_string(),
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
        };
        let rendered = format!("{:?}", db);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
