//! Domain types shared by the ETL pipeline and the data generators

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VitalsError};

// ============================================================================
// Column Layout
// ============================================================================

/// Columns every monthly source file must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "patient_id",
    "heart_rate",
    "weight",
    "systolic",
    "diastolic",
    "record_date",
];

/// Column order of `health_stats` and of every staging artifact.
pub const STAGED_COLUMNS: [&str; 8] = [
    "patient_id",
    "heart_rate",
    "weight",
    "systolic",
    "diastolic",
    "record_date",
    "ingested_at",
    "source_file",
];

/// Column order of `health_stats_staging_errors`.
pub const QUARANTINE_COLUMNS: [&str; 9] = [
    "patient_id",
    "heart_rate",
    "weight",
    "systolic",
    "diastolic",
    "record_date",
    "ingested_at",
    "source_file",
    "error",
];

// ============================================================================
// Records
// ============================================================================

/// A source row exactly as read from a monthly file, before any coercion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHealthRow {
    pub patient_id: String,
    pub heart_rate: String,
    pub weight: String,
    pub systolic: String,
    pub diastolic: String,
    pub record_date: String,
}

/// One day of vitals for one patient, with every field coerced to its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub patient_id: String,
    pub heart_rate: i32,
    pub weight: f64,
    pub systolic: i32,
    pub diastolic: i32,
    pub record_date: NaiveDate,
}

/// Ingestion metadata attached to every row that leaves the preprocessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestMetadata {
    pub ingested_at: NaiveDateTime,
    pub source_file: String,
}

/// A validated record decorated with ingestion metadata, in staging column order.
///
/// Borrows from the record and metadata so writing a staging artifact does not
/// copy every row.
#[derive(Debug, Clone, Serialize)]
pub struct StagedRecord<'a> {
    pub patient_id: &'a str,
    pub heart_rate: i32,
    pub weight: f64,
    pub systolic: i32,
    pub diastolic: i32,
    pub record_date: NaiveDate,
    pub ingested_at: NaiveDateTime,
    pub source_file: &'a str,
}

impl<'a> StagedRecord<'a> {
    pub fn new(record: &'a HealthRecord, metadata: &'a IngestMetadata) -> Self {
        Self {
            patient_id: &record.patient_id,
            heart_rate: record.heart_rate,
            weight: record.weight,
            systolic: record.systolic,
            diastolic: record.diastolic,
            record_date: record.record_date,
            ingested_at: metadata.ingested_at,
            source_file: &metadata.source_file,
        }
    }
}

/// A row that failed validation, bound for the quarantine table.
///
/// Fields that could not be coerced are `None`; the raw value is kept in
/// `error`, which is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub patient_id: String,
    pub heart_rate: Option<i32>,
    pub weight: Option<f64>,
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub record_date: Option<NaiveDate>,
    pub ingested_at: NaiveDateTime,
    pub source_file: String,
    pub error: String,
}

// ============================================================================
// Partitions
// ============================================================================

/// A year/month unit of source data, backed by exactly one monthly file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Partition {
    pub year: i32,
    pub month: u32,
}

impl Partition {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(VitalsError::InvalidPartition(format!(
                "month {} out of range for year {}",
                month, year
            )));
        }
        Ok(Self { year, month })
    }

    /// All twelve partitions of a year, January first.
    pub fn months_of(year: i32) -> impl Iterator<Item = Partition> {
        (1..=12).map(move |month| Partition { year, month })
    }

    /// Expected monthly file name, e.g. `health_data_201403.csv`.
    pub fn file_name(&self) -> String {
        format!("health_data_{}{:02}.csv", self.year, self.month)
    }

    /// Parse a year directory name such as `"2014"`.
    pub fn parse_year(label: &str) -> Result<i32> {
        if label.is_empty() || !label.chars().all(|c| c.is_ascii_digit()) {
            return Err(VitalsError::Parse(format!(
                "partition year '{}' is not purely numeric",
                label
            )));
        }
        label
            .parse()
            .map_err(|e| VitalsError::Parse(format!("partition year '{}': {}", label, e)))
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_file_name_zero_pads_month() {
        let partition = Partition::new(2014, 3).unwrap();
        assert_eq!(partition.file_name(), "health_data_201403.csv");
        assert_eq!(partition.to_string(), "2014-03");
    }

    #[test]
    fn test_partition_rejects_bad_month() {
        assert!(Partition::new(2014, 0).is_err());
        assert!(Partition::new(2014, 13).is_err());
    }

    #[test]
    fn test_months_of_year() {
        let names: Vec<String> = Partition::months_of(2020).map(|p| p.file_name()).collect();
        assert_eq!(names.len(), 12);
        assert_eq!(names[0], "health_data_202001.csv");
        assert_eq!(names[11], "health_data_202012.csv");
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(Partition::parse_year("2015").unwrap(), 2015);
        assert!(Partition::parse_year("notes").is_err());
        assert!(Partition::parse_year("").is_err());
        assert!(Partition::parse_year("20a5").is_err());
    }

    #[test]
    fn test_staged_record_column_order() {
        let record = HealthRecord {
            patient_id: "AB12345C".to_string(),
            heart_rate: 72,
            weight: 180.5,
            systolic: 120,
            diastolic: 80,
            record_date: NaiveDate::from_ymd_opt(2014, 1, 2).unwrap(),
        };
        let metadata = IngestMetadata {
            ingested_at: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
            source_file: "health_data_201401.csv".to_string(),
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(StagedRecord::new(&record, &metadata)).unwrap();
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let mut lines = output.lines();
        assert_eq!(lines.next().unwrap(), STAGED_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "AB12345C,72,180.5,120,80,2014-01-02,2024-05-01T08:30:00,health_data_201401.csv"
        );
    }
}
