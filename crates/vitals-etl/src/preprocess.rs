//! File preprocessing
//!
//! Splits one monthly source file into a staging artifact of validated rows and
//! a batch of quarantined rows. Rows are streamed: valid rows go straight to the
//! staging writer, only invalid rows are held in memory until the single
//! quarantine append.

use chrono::{Local, NaiveDateTime, SubsecRound};
use csv::StringRecord;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use vitals_common::types::{
    ErrorRecord, IngestMetadata, RawHealthRow, StagedRecord, REQUIRED_COLUMNS, STAGED_COLUMNS,
};

use crate::error::{EtlError, EtlResult};
use crate::store::EtlStore;
use crate::validate::{quarantine_record, validate, RowError};

/// Suffix appended to the source file stem to name its staging artifact.
pub const STAGING_SUFFIX: &str = "_temp";

/// Result of preprocessing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessOutcome {
    pub staging_path: PathBuf,
    pub valid_rows: usize,
    pub quarantined_rows: usize,
}

/// `dir/health_data_201401.csv` -> `dir/health_data_201401_temp.csv`
pub fn staging_path_for(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{}{}.csv", stem, STAGING_SUFFIX))
}

fn ingestion_timestamp() -> NaiveDateTime {
    // TIMESTAMP keeps microseconds.
    Local::now().naive_local().trunc_subsecs(6)
}

/// Positions of the required columns in a source header
struct ColumnIndex {
    patient_id: usize,
    heart_rate: usize,
    weight: usize,
    systolic: usize,
    diastolic: usize,
    record_date: usize,
}

impl ColumnIndex {
    fn resolve(path: &Path, headers: &StringRecord) -> EtlResult<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();

        match (
            position("patient_id"),
            position("heart_rate"),
            position("weight"),
            position("systolic"),
            position("diastolic"),
            position("record_date"),
        ) {
            (
                Some(patient_id),
                Some(heart_rate),
                Some(weight),
                Some(systolic),
                Some(diastolic),
                Some(record_date),
            ) => Ok(Self {
                patient_id,
                heart_rate,
                weight,
                systolic,
                diastolic,
                record_date,
            }),
            _ => Err(EtlError::Schema {
                path: path.to_path_buf(),
                missing,
            }),
        }
    }

    /// First required field absent from a short row, in validation order
    fn first_absent(&self, record: &StringRecord) -> Option<&'static str> {
        [
            ("patient_id", self.patient_id),
            ("systolic", self.systolic),
            ("diastolic", self.diastolic),
            ("heart_rate", self.heart_rate),
            ("weight", self.weight),
            ("record_date", self.record_date),
        ]
        .into_iter()
        .find(|(_, idx)| record.get(*idx).is_none())
        .map(|(name, _)| name)
    }

    fn raw_row(&self, record: &StringRecord) -> RawHealthRow {
        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        RawHealthRow {
            patient_id: field(self.patient_id),
            heart_rate: field(self.heart_rate),
            weight: field(self.weight),
            systolic: field(self.systolic),
            diastolic: field(self.diastolic),
            record_date: field(self.record_date),
        }
    }
}

/// A source file split into a written staging artifact and quarantine rows
#[derive(Debug)]
pub struct SplitFile {
    pub staging_path: PathBuf,
    pub valid_rows: usize,
    pub errors: Vec<ErrorRecord>,
}

/// Validate every row of `path`, writing valid rows to the staging artifact.
///
/// Fails with [`EtlError::Schema`] before anything is written when required
/// columns are absent. A partially written artifact is removed on failure.
pub fn split_file(path: &Path, source_file: &str) -> EtlResult<SplitFile> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| EtlError::csv(path, e))?;

    let headers = reader.headers().map_err(|e| EtlError::csv(path, e))?.clone();
    let index = ColumnIndex::resolve(path, &headers)?;

    let staging_path = staging_path_for(path);
    let result = write_staging(path, &mut reader, &index, &staging_path, source_file);

    if result.is_err() {
        if let Err(e) = std::fs::remove_file(&staging_path) {
            debug!(path = %staging_path.display(), error = %e, "No partial staging artifact to remove");
        }
    }

    result
}

fn write_staging(
    path: &Path,
    reader: &mut csv::Reader<std::fs::File>,
    index: &ColumnIndex,
    staging_path: &Path,
    source_file: &str,
) -> EtlResult<SplitFile> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(staging_path)
        .map_err(|e| EtlError::csv(staging_path, e))?;
    writer
        .write_record(STAGED_COLUMNS)
        .map_err(|e| EtlError::csv(staging_path, e))?;

    let mut valid_rows = 0;
    let mut errors = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| EtlError::csv(path, e))?;
        let metadata = IngestMetadata {
            ingested_at: ingestion_timestamp(),
            source_file: source_file.to_string(),
        };

        let raw = index.raw_row(&record);
        let checked = match index.first_absent(&record) {
            Some(field) => Err(RowError::absent(field)),
            None => validate(&raw),
        };

        match checked {
            Ok(health) => {
                writer
                    .serialize(StagedRecord::new(&health, &metadata))
                    .map_err(|e| EtlError::csv(staging_path, e))?;
                valid_rows += 1;
            },
            Err(row_error) => errors.push(quarantine_record(raw, &metadata, &row_error)),
        }
    }

    writer.flush().map_err(|e| EtlError::io(staging_path, e))?;

    Ok(SplitFile {
        staging_path: staging_path.to_path_buf(),
        valid_rows,
        errors,
    })
}

/// Preprocess one partition file.
///
/// Writes the staging artifact, then appends any invalid rows to the quarantine
/// table in one batch. The staging path is returned even when no row was valid
/// (the artifact then holds only the header). If the quarantine append fails the
/// artifact is removed so the file leaves nothing half-done behind.
pub async fn preprocess<S: EtlStore + ?Sized>(
    store: &mut S,
    path: &Path,
    partition_label: &str,
    source_file: &str,
) -> EtlResult<PreprocessOutcome> {
    let split = {
        let owned_path = path.to_path_buf();
        let owned_source = source_file.to_string();
        tokio::task::spawn_blocking(move || split_file(&owned_path, &owned_source))
            .await
            .map_err(|e| EtlError::io(path, std::io::Error::other(e)))??
    };

    let quarantined_rows = split.errors.len();
    if quarantined_rows > 0 {
        if let Err(e) = store.append_quarantine(&split.errors).await {
            if let Err(rm) = std::fs::remove_file(&split.staging_path) {
                debug!(path = %split.staging_path.display(), error = %rm, "Failed to remove staging artifact");
            }
            return Err(e.into());
        }
        warn!(
            file = %source_file,
            partition = %partition_label,
            quarantined = quarantined_rows,
            "{} rows quarantined from {}",
            quarantined_rows,
            source_file
        );
    }

    debug!(
        file = %source_file,
        valid = split.valid_rows,
        staging = %split.staging_path.display(),
        "Preprocessed partition file"
    );

    Ok(PreprocessOutcome {
        staging_path: split.staging_path,
        valid_rows: split.valid_rows,
        quarantined_rows,
    })
}
