//! Store interface used by the pipeline
//!
//! The orchestrator, preprocessor and loader talk to the relational store only
//! through [`EtlStore`], so their failure semantics can be exercised without a
//! live database.

use async_trait::async_trait;
use std::path::Path;
use vitals_common::types::ErrorRecord;

use crate::db::DbResult;
use crate::patients::PatientTable;

/// Target table for validated health rows.
pub const HEALTH_STATS_TABLE: &str = "health_stats";

/// Quarantine table for rows that failed validation.
pub const QUARANTINE_TABLE: &str = "health_stats_staging_errors";

/// Patient reference table, replaced on every run.
pub const PATIENTS_TABLE: &str = "patients";

/// Operations the ETL needs from the relational store
#[async_trait]
pub trait EtlStore: Send {
    /// Create the target and quarantine tables if they do not exist
    async fn ensure_schema(&mut self) -> DbResult<()>;

    /// Drop and recreate the patient table from `table`, returning rows loaded
    async fn replace_patients(&mut self, table: &PatientTable) -> DbResult<u64>;

    /// Append one file's quarantined rows in a single batch
    async fn append_quarantine(&mut self, rows: &[ErrorRecord]) -> DbResult<u64>;

    /// Bulk-copy a CSV file with a header row into `table`, committing on success
    async fn copy_csv(&mut self, table: &str, csv_path: &Path) -> DbResult<u64>;

    /// Current row count of `table`
    async fn count_rows(&mut self, table: &str) -> DbResult<i64>;
}

#[cfg(test)]
pub(crate) mod memory;
