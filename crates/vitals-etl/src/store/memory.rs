//! In-memory store for exercising the pipeline without Postgres

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use vitals_common::types::ErrorRecord;

use super::{EtlStore, HEALTH_STATS_TABLE, QUARANTINE_TABLE};
use crate::db::{DbError, DbResult};
use crate::patients::PatientTable;

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    pub schema_runs: usize,
    pub patients_loaded: Option<u64>,
    pub quarantine: Vec<ErrorRecord>,
    pub quarantine_batches: usize,
    pub fail_quarantine: bool,
    /// Every call fails as if the connection dropped
    pub unreachable: bool,
    pub tables: HashMap<String, u64>,
    pub rejected_copies: HashSet<String>,
}

impl MemoryStore {
    pub fn rows(&self, table: &str) -> u64 {
        self.tables.get(table).copied().unwrap_or(0)
    }

    /// Make the COPY of the staging artifact named `file_name` fail
    pub fn reject_copy_of(&mut self, file_name: &str) {
        self.rejected_copies.insert(file_name.to_string());
    }

    fn check_reachable(&self) -> DbResult<()> {
        if self.unreachable {
            return Err(DbError::Sqlx(sqlx::Error::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionReset,
            ))));
        }
        Ok(())
    }
}

fn rejected(message: &str) -> DbError {
    DbError::Sqlx(sqlx::Error::Configuration(message.to_string().into()))
}

#[async_trait]
impl EtlStore for MemoryStore {
    async fn ensure_schema(&mut self) -> DbResult<()> {
        self.check_reachable()?;
        self.schema_runs += 1;
        self.tables.entry(HEALTH_STATS_TABLE.to_string()).or_insert(0);
        Ok(())
    }

    async fn replace_patients(&mut self, table: &PatientTable) -> DbResult<u64> {
        self.check_reachable()?;
        let rows = table.row_count() as u64;
        self.patients_loaded = Some(rows);
        Ok(rows)
    }

    async fn append_quarantine(&mut self, rows: &[ErrorRecord]) -> DbResult<u64> {
        self.check_reachable()?;
        if self.fail_quarantine {
            return Err(rejected("quarantine insert rejected"));
        }
        self.quarantine.extend_from_slice(rows);
        self.quarantine_batches += 1;
        Ok(rows.len() as u64)
    }

    async fn copy_csv(&mut self, table: &str, csv_path: &Path) -> DbResult<u64> {
        self.check_reachable()?;

        let file_name = csv_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.rejected_copies.contains(&file_name) {
            return Err(rejected("COPY rejected"));
        }

        let mut reader = csv::Reader::from_path(csv_path)
            .map_err(|e| DbError::Io(std::io::Error::other(e)))?;
        let rows = reader.records().count() as u64;

        *self.tables.entry(table.to_string()).or_insert(0) += rows;
        Ok(rows)
    }

    async fn count_rows(&mut self, table: &str) -> DbResult<i64> {
        self.check_reachable()?;
        if table == QUARANTINE_TABLE {
            return Ok(self.quarantine.len() as i64);
        }
        Ok(self.rows(table) as i64)
    }
}
