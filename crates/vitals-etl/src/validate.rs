//! Row validation
//!
//! A row is valid when every field coerces to its column type. There are no
//! range or plausibility checks: a heart rate of 900 is valid, "abc" is not.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use vitals_common::types::{ErrorRecord, HealthRecord, IngestMetadata, RawHealthRow};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// The first field of a row that failed to coerce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static str,
    pub cause: String,
}

impl RowError {
    fn new(
        field: &'static str,
        value: &str,
        expected: &'static str,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            field,
            value: value.to_string(),
            expected,
            cause: cause.into(),
        }
    }

    /// A required field absent from a short row
    pub(crate) fn absent(field: &'static str) -> Self {
        Self::new(field, "", "value", "field missing from row")
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: cannot convert '{}' to {} ({})",
            self.field, self.value, self.expected, self.cause
        )
    }
}

impl std::error::Error for RowError {}

fn parse_int(field: &'static str, raw: &str) -> Result<i32, RowError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(RowError::new(field, raw, "integer", "empty value"));
    }

    match value.parse::<i32>() {
        Ok(parsed) => Ok(parsed),
        Err(int_err) => match value.parse::<f64>() {
            // "72.0" is how a numeric column with gaps gets written out.
            Ok(float)
                if float.is_finite()
                    && float.fract() == 0.0
                    && float >= f64::from(i32::MIN)
                    && float <= f64::from(i32::MAX) =>
            {
                Ok(float as i32)
            },
            _ => Err(RowError::new(field, raw, "integer", int_err.to_string())),
        },
    }
}

fn parse_float(field: &'static str, raw: &str) -> Result<f64, RowError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(RowError::new(field, raw, "float", "empty value"));
    }
    value
        .parse::<f64>()
        .map_err(|e| RowError::new(field, raw, "float", e.to_string()))
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, RowError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(RowError::new(field, raw, "date", "empty value"));
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .ok_or_else(|| RowError::new(field, raw, "date", "unrecognized date format"))
}

/// Validate one row, returning it fully typed.
///
/// Fields are checked in the order patient_id, systolic, diastolic, heart_rate,
/// weight, record_date; the first failure is reported.
pub fn validate(row: &RawHealthRow) -> Result<HealthRecord, RowError> {
    // patient_id is passed through unchecked. An empty id stages as an empty
    // field, which COPY reads as NULL, so the store rejects that file's load.
    let patient_id = row.patient_id.clone();
    let systolic = parse_int("systolic", &row.systolic)?;
    let diastolic = parse_int("diastolic", &row.diastolic)?;
    let heart_rate = parse_int("heart_rate", &row.heart_rate)?;
    let weight = parse_float("weight", &row.weight)?;
    let record_date = parse_date("record_date", &row.record_date)?;

    Ok(HealthRecord {
        patient_id,
        heart_rate,
        weight,
        systolic,
        diastolic,
        record_date,
    })
}

/// Build the quarantine record for a row that failed validation.
///
/// Fields that do coerce are kept typed; the rest are stored as NULL and the
/// offending raw value survives in the error text.
pub fn quarantine_record(
    row: RawHealthRow,
    metadata: &IngestMetadata,
    error: &RowError,
) -> ErrorRecord {
    ErrorRecord {
        heart_rate: parse_int("heart_rate", &row.heart_rate).ok(),
        weight: parse_float("weight", &row.weight).ok(),
        systolic: parse_int("systolic", &row.systolic).ok(),
        diastolic: parse_int("diastolic", &row.diastolic).ok(),
        record_date: parse_date("record_date", &row.record_date).ok(),
        patient_id: row.patient_id,
        ingested_at: metadata.ingested_at,
        source_file: metadata.source_file.clone(),
        error: error.to_string(),
    }
}
