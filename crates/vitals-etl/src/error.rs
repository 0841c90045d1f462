//! ETL error taxonomy
//!
//! Row-level validation failures are values ([`crate::validate::RowError`]) and
//! never show up here. Of the variants below only [`EtlError::MissingInput`] and
//! [`EtlError::Connectivity`] end a run; everything else is confined to the file
//! that produced it.

use std::path::PathBuf;
use thiserror::Error;
use vitals_common::VitalsError;

use crate::db::DbError;

/// Result type alias for ETL operations
pub type EtlResult<T> = std::result::Result<T, EtlError>;

#[derive(Error, Debug)]
pub enum EtlError {
    /// A source file lacks required columns; the whole file is rejected
    #[error("{}: missing required columns {missing:?}", .path.display())]
    Schema { path: PathBuf, missing: Vec<String> },

    /// A required input (the patient file) does not exist
    #[error("required input file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    /// The bulk copy of a staging artifact failed and was rolled back
    #[error("bulk load of {} failed: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    /// The store cannot be reached
    #[error("store unreachable: {0}")]
    Connectivity(#[source] DbError),

    /// A store operation failed while the connection stayed usable
    #[error("store operation failed: {0}")]
    Store(#[source] DbError),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Common(#[from] VitalsError),
}

impl EtlError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, EtlError::MissingInput(_) | EtlError::Connectivity(_))
    }
}

impl From<DbError> for EtlError {
    fn from(err: DbError) -> Self {
        if err.is_connectivity() {
            EtlError::Connectivity(err)
        } else {
            EtlError::Store(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(EtlError::MissingInput(PathBuf::from("data/patients.csv")).is_fatal());
        assert!(EtlError::from(DbError::Sqlx(sqlx::Error::PoolClosed)).is_fatal());

        let schema = EtlError::Schema {
            path: PathBuf::from("health_data_201401.csv"),
            missing: vec!["weight".to_string()],
        };
        assert!(!schema.is_fatal());
        assert!(!EtlError::from(DbError::Sqlx(sqlx::Error::RowNotFound)).is_fatal());
    }

    #[test]
    fn test_schema_error_names_missing_columns() {
        let err = EtlError::Schema {
            path: PathBuf::from("health_data/2014/health_data_201401.csv"),
            missing: vec!["weight".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("health_data_201401.csv"));
        assert!(message.contains("\"weight\""));
    }
}
