//! Patient reference table
//!
//! The patient file's columns are not fixed, so the table is rebuilt from
//! whatever header the file carries. Column types are inferred from the values.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::db::schema::quote_ident;
use crate::error::{EtlError, EtlResult};

/// SQL type inferred for one patient column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Boolean,
    Date,
    Text,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::Text => "TEXT",
        }
    }

    fn of_value(value: &str) -> ColumnType {
        let value = value.trim();
        if value.parse::<i64>().is_ok() {
            ColumnType::BigInt
        } else if value.parse::<f64>().is_ok() {
            ColumnType::Double
        } else if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
            ColumnType::Boolean
        } else if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
            ColumnType::Date
        } else {
            ColumnType::Text
        }
    }

    /// Narrowest type that holds both
    fn widen(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (BigInt, Double) | (Double, BigInt) => Double,
            _ => Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientColumn {
    pub name: String,
    pub column_type: ColumnType,
}

/// A scanned patient file, ready to replace the `patients` table
#[derive(Debug, Clone)]
pub struct PatientTable {
    source: PathBuf,
    columns: Vec<PatientColumn>,
    rows: usize,
}

impl PatientTable {
    /// Scan the patient file's header and values.
    ///
    /// Fails with [`EtlError::MissingInput`] when the file does not exist.
    pub fn scan(path: &Path) -> EtlResult<Self> {
        if !path.is_file() {
            return Err(EtlError::MissingInput(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| EtlError::csv(path, e))?;

        let names: Vec<String> = reader
            .headers()
            .map_err(|e| EtlError::csv(path, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut inferred: Vec<Option<ColumnType>> = vec![None; names.len()];
        let mut rows = 0;

        for record in reader.records() {
            let record = record.map_err(|e| EtlError::csv(path, e))?;
            for (slot, value) in inferred.iter_mut().zip(record.iter()) {
                // Empty cells load as NULL and say nothing about the type.
                if value.trim().is_empty() {
                    continue;
                }
                let seen = ColumnType::of_value(value);
                *slot = Some(slot.map_or(seen, |current| current.widen(seen)));
            }
            rows += 1;
        }

        let columns: Vec<PatientColumn> = names
            .into_iter()
            .zip(inferred)
            .map(|(name, column_type)| PatientColumn {
                name,
                column_type: column_type.unwrap_or(ColumnType::Text),
            })
            .collect();

        debug!(path = %path.display(), columns = columns.len(), rows, "Scanned patient file");

        Ok(Self {
            source: path.to_path_buf(),
            columns,
            rows,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn columns(&self) -> &[PatientColumn] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn create_table_sql(&self, table: &str) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({})", quote_ident(table), columns)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn patient_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_scan_infers_column_types() {
        let file = patient_file(
            "id,birthdate,gender,height,start_weight,active\n\
             AB12345C,1970-05-01,M,70,180,true\n\
             CD54321D,1985-11-23,F,64,151.5,false\n",
        );

        let table = PatientTable::scan(file.path()).unwrap();
        let types: Vec<(&str, ColumnType)> = table
            .columns()
            .iter()
            .map(|c| (c.name.as_str(), c.column_type))
            .collect();

        assert_eq!(
            types,
            vec![
                ("id", ColumnType::Text),
                ("birthdate", ColumnType::Date),
                ("gender", ColumnType::Text),
                ("height", ColumnType::BigInt),
                ("start_weight", ColumnType::Double),
                ("active", ColumnType::Boolean),
            ]
        );
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_empty_and_mixed_columns_fall_back_to_text() {
        let file = patient_file("id,notes,code\nA,,12\nB,,x1\n");
        let table = PatientTable::scan(file.path()).unwrap();

        assert_eq!(table.columns()[1].column_type, ColumnType::Text);
        assert_eq!(table.columns()[2].column_type, ColumnType::Text);
    }

    #[test]
    fn test_missing_patient_file() {
        let err = PatientTable::scan(Path::new("/nonexistent/patients.csv")).unwrap_err();
        assert!(matches!(err, EtlError::MissingInput(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_create_table_sql() {
        let file = patient_file("id,height\nAB12345C,70\n");
        let table = PatientTable::scan(file.path()).unwrap();

        assert_eq!(
            table.create_table_sql("patients"),
            "CREATE TABLE \"patients\" (\"id\" TEXT, \"height\" BIGINT)"
        );
    }
}
