//! Pipeline orchestration
//!
//! One run: schema setup, patient reload, then every discovered partition file
//! through preprocess and bulk load, then an advisory row count. Files are
//! processed one at a time. A file that fails is reported and skipped; only a
//! missing patient file or a lost store connection ends the run early.

use std::path::PathBuf;
use tracing::{error, info, info_span, warn, Instrument};
use vitals_common::types::Partition;

use crate::config::{EtlConfig, PathConfig};
use crate::db::PgStore;
use crate::discovery::{plan, PartitionFile};
use crate::error::{EtlError, EtlResult};
use crate::loader::load;
use crate::patients::PatientTable;
use crate::preprocess::preprocess;
use crate::store::{EtlStore, HEALTH_STATS_TABLE};

/// Where a file's processing stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    Preprocess,
    Load,
}

/// What happened to one partition file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Loaded {
        rows: u64,
        quarantined: usize,
    },
    Failed {
        stage: FileStage,
        reason: String,
        /// Rows already committed to quarantine before the failure
        quarantined: usize,
        /// Staging artifact left on disk for diagnosis
        retained_staging: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub partition: Partition,
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub patients_loaded: u64,
    pub files: Vec<FileReport>,
    /// Expected monthly files that did not exist
    pub missing_files: Vec<PathBuf>,
    /// Row count of `health_stats` after the run, if it could be read
    pub total_rows: Option<i64>,
}

impl RunReport {
    pub fn loaded_rows(&self) -> u64 {
        self.files
            .iter()
            .filter_map(|f| match f.outcome {
                FileOutcome::Loaded { rows, .. } => Some(rows),
                FileOutcome::Failed { .. } => None,
            })
            .sum()
    }

    pub fn quarantined_rows(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f.outcome {
                FileOutcome::Loaded { quarantined, .. } | FileOutcome::Failed { quarantined, .. } => {
                    quarantined
                },
            })
            .sum()
    }

    pub fn failed_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed { .. }))
    }

    pub fn summary(&self) -> String {
        format!(
            "{} files loaded ({} rows, {} quarantined), {} failed, {} missing",
            self.files.len() - self.failed_files().count(),
            self.loaded_rows(),
            self.quarantined_rows(),
            self.failed_files().count(),
            self.missing_files.len()
        )
    }
}

/// Sequential ETL over one store
pub struct EtlPipeline<S: EtlStore> {
    store: S,
    paths: PathConfig,
    keep_failed_staging: bool,
}

impl<S: EtlStore> EtlPipeline<S> {
    pub fn new(store: S, config: &EtlConfig) -> Self {
        Self::with_paths(store, config.paths.clone(), config.keep_failed_staging)
    }

    pub fn with_paths(store: S, paths: PathConfig, keep_failed_staging: bool) -> Self {
        Self {
            store,
            paths,
            keep_failed_staging,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run the whole pipeline once
    pub async fn run(&mut self) -> EtlResult<RunReport> {
        info!(
            health_data = %self.paths.health_data_dir.display(),
            patients = %self.paths.patient_file.display(),
            "Starting ETL run"
        );

        self.store.ensure_schema().await?;
        info!("Schema ready");

        let patients = PatientTable::scan(&self.paths.patient_file)?;
        let patients_loaded = self.store.replace_patients(&patients).await?;
        info!(rows = patients_loaded, "Patient data loaded");

        let mut report = RunReport {
            patients_loaded,
            ..Default::default()
        };

        let files = match plan(&self.paths.health_data_dir) {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "No partitions to ingest");
                Vec::new()
            },
        };

        for file in files {
            if !file.exists() {
                report.missing_files.push(file.path);
                continue;
            }

            let year = file.partition.year.to_string();
            let span = info_span!("partition_file", file = %file.file_name);
            let outcome = self.process_file(&year, &file).instrument(span).await?;
            report.files.push(FileReport {
                partition: file.partition,
                path: file.path,
                outcome,
            });
        }

        if !report.missing_files.is_empty() {
            warn!(count = report.missing_files.len(), "Missing health data files:");
            for path in &report.missing_files {
                warn!("  - {}", path.display());
            }
        }

        report.total_rows = self.verify_row_count(report.loaded_rows()).await?;

        info!(summary = %report.summary(), "ETL completed");
        Ok(report)
    }

    /// Preprocess, load and clean up one existing file.
    ///
    /// Returns `Err` only for fatal errors; everything else becomes a
    /// [`FileOutcome::Failed`].
    async fn process_file(&mut self, year: &str, file: &PartitionFile) -> EtlResult<FileOutcome> {
        let prepared = match preprocess(&mut self.store, &file.path, year, &file.file_name).await {
            Ok(prepared) => prepared,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(error = %e, "Error processing {}", file.file_name);
                return Ok(FileOutcome::Failed {
                    stage: FileStage::Preprocess,
                    reason: e.to_string(),
                    quarantined: 0,
                    retained_staging: None,
                });
            },
        };

        let staging = prepared.staging_path;
        let outcome = load(&mut self.store, &staging, HEALTH_STATS_TABLE).await?;

        match outcome.into_result(&staging) {
            Ok(rows) => {
                if let Err(e) = tokio::fs::remove_file(&staging).await {
                    warn!(path = %staging.display(), error = %e, "Failed to remove staging artifact");
                }
                info!(rows, quarantined = prepared.quarantined_rows, "Loaded {}", file.file_name);
                Ok(FileOutcome::Loaded {
                    rows,
                    quarantined: prepared.quarantined_rows,
                })
            },
            Err(e) => {
                error!(error = %e, "Error processing {}", file.file_name);
                let retained_staging = if self.keep_failed_staging {
                    Some(staging)
                } else {
                    if let Err(rm) = tokio::fs::remove_file(&staging).await {
                        warn!(path = %staging.display(), error = %rm, "Failed to remove staging artifact");
                    }
                    None
                };
                Ok(FileOutcome::Failed {
                    stage: FileStage::Load,
                    reason: e.to_string(),
                    quarantined: prepared.quarantined_rows,
                    retained_staging,
                })
            },
        }
    }

    /// Advisory check of the target table; never fails the run unless the
    /// store is gone.
    async fn verify_row_count(&mut self, loaded_this_run: u64) -> EtlResult<Option<i64>> {
        match self.store.count_rows(HEALTH_STATS_TABLE).await {
            Ok(total) => {
                info!("Total rows in {}: {}", HEALTH_STATS_TABLE, total);
                if total < 0 || (total as u64) < loaded_this_run {
                    warn!(
                        total,
                        loaded_this_run,
                        "Target table holds fewer rows than were loaded during this run"
                    );
                }
                Ok(Some(total))
            },
            Err(e) if e.is_connectivity() => Err(EtlError::Connectivity(e)),
            Err(e) => {
                warn!(error = %e, "Could not count rows in {}", HEALTH_STATS_TABLE);
                Ok(None)
            },
        }
    }
}

/// Connect, run once, and close the connection on every exit path.
pub async fn run_etl(config: &EtlConfig) -> EtlResult<RunReport> {
    let store = PgStore::connect(&config.database).await?;

    let mut pipeline = EtlPipeline::new(store, config);
    let result = pipeline.run().await;

    if let Err(e) = pipeline.into_store().close().await {
        warn!(error = %e, "Failed to close database connection cleanly");
    }

    result
}
