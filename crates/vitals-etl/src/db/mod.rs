//! Postgres-backed store
//!
//! One [`PgConnection`] is held for the whole run and closed explicitly by the
//! caller through [`PgStore::close`].

pub mod schema;

mod copy;
mod quarantine;

use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use vitals_common::types::ErrorRecord;

use crate::config::DatabaseConfig;
use crate::patients::PatientTable;
use crate::store::{EtlStore, PATIENTS_TABLE};
use schema::{quote_ident, SCHEMA_STATEMENTS};

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Reading a bulk-copy source failed
    #[error("Failed to read bulk-copy source: {0}")]
    Io(#[from] std::io::Error),

    /// Connecting took longer than the configured timeout
    #[error("Timed out after {0:?} connecting to the database")]
    ConnectTimeout(Duration),
}

impl DbError {
    /// Whether the failure means the store itself is unreachable
    pub fn is_connectivity(&self) -> bool {
        match self {
            DbError::Sqlx(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::Protocol(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            DbError::Io(_) => false,
            DbError::ConnectTimeout(_) => true,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// The relational store, over a single connection
pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    /// Open the run's connection
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        let options = config.connect_options();
        let timeout = config.connect_timeout();

        let conn = tokio::time::timeout(timeout, PgConnection::connect_with(&options))
            .await
            .map_err(|_| DbError::ConnectTimeout(timeout))??;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Database connection opened"
        );

        Ok(Self { conn })
    }

    /// Close the connection, flushing the terminate message
    pub async fn close(self) -> DbResult<()> {
        self.conn.close().await?;
        tracing::debug!("Database connection closed");
        Ok(())
    }
}

#[async_trait]
impl EtlStore for PgStore {
    async fn ensure_schema(&mut self) -> DbResult<()> {
        let mut tx = self.conn.begin().await?;
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn replace_patients(&mut self, table: &PatientTable) -> DbResult<u64> {
        let mut tx = self.conn.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(PATIENTS_TABLE)))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&table.create_table_sql(PATIENTS_TABLE))
            .execute(&mut *tx)
            .await?;
        let rows = copy::copy_file_in(&mut tx, PATIENTS_TABLE, table.source()).await?;

        tx.commit().await?;
        Ok(rows)
    }

    async fn append_quarantine(&mut self, rows: &[ErrorRecord]) -> DbResult<u64> {
        quarantine::insert_error_records(&mut self.conn, rows).await
    }

    async fn copy_csv(&mut self, table: &str, csv_path: &Path) -> DbResult<u64> {
        let mut tx = self.conn.begin().await?;

        match copy::copy_file_in(&mut tx, table, csv_path).await {
            Ok(rows) => {
                tx.commit().await?;
                Ok(rows)
            },
            Err(err) => {
                // The original error matters more than a failed rollback.
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback after failed COPY also failed");
                }
                Err(err)
            },
        }
    }

    async fn count_rows(&mut self, table: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)))
                .fetch_one(&mut self.conn)
                .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(DbError::Sqlx(sqlx::Error::PoolTimedOut).is_connectivity());
        assert!(DbError::ConnectTimeout(Duration::from_secs(1)).is_connectivity());
        assert!(DbError::Sqlx(sqlx::Error::Io(std::io::Error::from(
            std::io::ErrorKind::ConnectionReset
        )))
        .is_connectivity());

        assert!(!DbError::Sqlx(sqlx::Error::RowNotFound).is_connectivity());
        assert!(!DbError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)).is_connectivity());
    }
}
