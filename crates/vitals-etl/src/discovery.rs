//! Partition discovery
//!
//! Years are discovered by scanning the base directory for purely numeric
//! subdirectories. Months are not scanned: each year is assumed to hold twelve
//! monthly files, and each one is probed for existence by the orchestrator.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use vitals_common::types::Partition;

use crate::error::{EtlError, EtlResult};

/// One expected monthly file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFile {
    pub partition: Partition,
    pub file_name: String,
    pub path: PathBuf,
}

impl PartitionFile {
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Immediate subdirectories of `base` whose names are all ASCII digits, sorted
/// ascending.
pub fn list_partition_years(base: &Path) -> EtlResult<Vec<String>> {
    let entries = std::fs::read_dir(base).map_err(|e| EtlError::io(base, e))?;

    let mut years = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EtlError::io(base, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) && entry.path().is_dir()
        {
            years.push(name.to_string());
        }
    }

    years.sort();
    debug!(base = %base.display(), years = ?years, "Discovered partition years");

    Ok(years)
}

/// The twelve monthly files expected under `base/<year_label>`.
pub fn expected_files(base: &Path, year_label: &str) -> EtlResult<Vec<PartitionFile>> {
    let year = Partition::parse_year(year_label)?;
    let dir = base.join(year_label);

    Ok(Partition::months_of(year)
        .map(|partition| {
            let file_name = partition.file_name();
            PartitionFile {
                path: dir.join(&file_name),
                partition,
                file_name,
            }
        })
        .collect())
}

/// Every expected monthly file across all discovered years, in load order.
pub fn plan(base: &Path) -> EtlResult<Vec<PartitionFile>> {
    let mut files = Vec::new();
    for year in list_partition_years(base)? {
        match expected_files(base, &year) {
            Ok(mut expected) => files.append(&mut expected),
            Err(e) => warn!(year = %year, error = %e, "Skipping unusable partition directory"),
        }
    }
    Ok(files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_partition_years_filters_and_sorts() {
        let base = TempDir::new().unwrap();
        for dir in ["2020", "2014", "notes", "2015"] {
            std::fs::create_dir(base.path().join(dir)).unwrap();
        }
        // A numeric file is not a partition.
        std::fs::write(base.path().join("2016"), "not a directory").unwrap();

        let years = list_partition_years(base.path()).unwrap();
        assert_eq!(years, vec!["2014", "2015", "2020"]);
    }

    #[test]
    fn test_list_partition_years_missing_base() {
        let err = list_partition_years(Path::new("/nonexistent/health_data")).unwrap_err();
        assert!(matches!(err, EtlError::Io { .. }));
    }

    #[test]
    fn test_expected_files() {
        let base = Path::new("health_data");
        let files = expected_files(base, "2014").unwrap();

        assert_eq!(files.len(), 12);
        assert_eq!(files[0].file_name, "health_data_201401.csv");
        assert_eq!(
            files[11].path,
            PathBuf::from("health_data/2014/health_data_201412.csv")
        );
    }

    #[test]
    fn test_plan_probes_existence() {
        let base = TempDir::new().unwrap();
        let year_dir = base.path().join("2015");
        std::fs::create_dir(&year_dir).unwrap();
        std::fs::write(year_dir.join("health_data_201502.csv"), "patient_id\n").unwrap();

        let files = plan(base.path()).unwrap();
        let present: Vec<&str> = files
            .iter()
            .filter(|f| f.exists())
            .map(|f| f.file_name.as_str())
            .collect();

        assert_eq!(files.len(), 12);
        assert_eq!(present, vec!["health_data_201502.csv"]);
    }
}
