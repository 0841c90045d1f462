//! Bulk loading of staging artifacts
//!
//! A failed COPY is rolled back by the store and reported as
//! [`LoadOutcome::Failed`] instead of an error, so the caller can move on to the
//! next file. Only a lost connection comes back as `Err`.

use std::path::Path;
use tracing::{error, info};

use crate::db::{DbError, DbResult};
use crate::error::{EtlError, EtlResult};
use crate::store::EtlStore;

/// Result of one bulk load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { rows: u64 },
    Failed { reason: String },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }

    /// Loaded row count, or [`EtlError::Load`] naming the staging artifact
    pub fn into_result(self, staging_path: &Path) -> EtlResult<u64> {
        match self {
            LoadOutcome::Loaded { rows } => Ok(rows),
            LoadOutcome::Failed { reason } => Err(EtlError::Load {
                path: staging_path.to_path_buf(),
                reason,
            }),
        }
    }
}

/// Bulk-copy a staging artifact into `table`.
pub async fn load<S: EtlStore + ?Sized>(
    store: &mut S,
    staging_path: &Path,
    table: &str,
) -> DbResult<LoadOutcome> {
    match store.copy_csv(table, staging_path).await {
        Ok(rows) => {
            info!(table, rows, path = %staging_path.display(), "Bulk copy committed");
            Ok(LoadOutcome::Loaded { rows })
        },
        Err(err) if err.is_connectivity() => Err(err),
        Err(err) => {
            error!(
                table,
                path = %staging_path.display(),
                error = %err,
                "COPY failed for {}, transaction rolled back",
                staging_path.display()
            );
            Ok(LoadOutcome::Failed {
                reason: describe(&err),
            })
        },
    }
}

fn describe(err: &DbError) -> String {
    match err {
        DbError::Sqlx(sqlx::Error::Database(db)) => match db.code() {
            Some(code) => format!("{} (SQLSTATE {})", db.message(), code),
            None => db.message().to_string(),
        },
        other => other.to_string(),
    }
}
