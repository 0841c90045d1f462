//! Shared helpers for the PostgreSQL integration tests
//!
//! Each test starts its own throwaway container, so tests never see each
//! other's rows. Docker must be running.

#![allow(dead_code)]

use anyhow::{Context, Result};
use sqlx::{Connection, PgConnection};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::info;
use vitals_etl::config::{DatabaseConfig, PathConfig};
use vitals_etl::db::PgStore;

pub const HEALTH_HEADER: &str = "patient_id,heart_rate,weight,systolic,diastolic,record_date";

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

pub struct TestPostgres {
    // Dropping the handle stops the container
    _container: ContainerAsync<Postgres>,
    config: DatabaseConfig,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let config = DatabaseConfig {
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "postgres".to_string(),
            host: host.to_string(),
            port,
            connect_timeout_secs: 30,
        };

        Ok(Self {
            _container: container,
            config,
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// A store on its own connection, as the pipeline uses it
    pub async fn store(&self) -> Result<PgStore> {
        PgStore::connect(&self.config)
            .await
            .context("Failed to connect store")
    }

    /// A separate connection for assertions
    pub async fn connection(&self) -> Result<PgConnection> {
        PgConnection::connect_with(&self.config.connect_options())
            .await
            .context("Failed to open assertion connection")
    }
}

pub async fn count(conn: &mut PgConnection, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", table))
        .fetch_one(conn)
        .await
        .unwrap_or(-1)
}

pub async fn table_exists(conn: &mut PgConnection, table: &str) -> bool {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
    )
    .bind(table)
    .fetch_one(conn)
    .await
    .unwrap_or(false)
}

// ============================================================================
// Source Data Fixtures
// ============================================================================

/// A temporary `data/patients.csv` + `health_data/` tree
pub struct SourceTree {
    dir: TempDir,
}

impl SourceTree {
    pub fn new(patients_csv: &str) -> Result<Self> {
        let dir = TempDir::new()?;
        std::fs::create_dir_all(dir.path().join("data"))?;
        std::fs::create_dir_all(dir.path().join("health_data"))?;
        std::fs::write(dir.path().join("data/patients.csv"), patients_csv)?;
        Ok(Self { dir })
    }

    pub fn paths(&self) -> PathConfig {
        PathConfig {
            health_data_dir: self.dir.path().join("health_data"),
            patient_file: self.dir.path().join("data/patients.csv"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a monthly file with the standard header followed by `rows`
    pub fn write_month(&self, year: i32, month: u32, rows: &[&str]) -> Result<PathBuf> {
        self.write_raw(year, month, &format!("{}\n{}\n", HEALTH_HEADER, rows.join("\n")))
    }

    /// Write a monthly file with arbitrary content
    pub fn write_raw(&self, year: i32, month: u32, content: &str) -> Result<PathBuf> {
        let dir = self.dir.path().join("health_data").join(year.to_string());
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("health_data_{}{:02}.csv", year, month));
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

/// Initialize tracing for tests; safe to call more than once
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,vitals_etl=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}
