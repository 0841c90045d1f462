//! Daily vitals history, one file per month

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vitals_common::types::{Partition, RawHealthRow};
use vitals_common::VitalsError;

use super::patients::Patient;
use crate::error::{EtlError, EtlResult};

/// Largest daily weight change, as a fraction of the previous day
const MAX_DAILY_WEIGHT_CHANGE: f64 = 0.02;

const CORRUPT_VALUES: [&str; 3] = ["n/a", "abc", "--"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthOptions {
    pub start_year: i32,
    pub end_year: i32,
    /// Fraction of rows whose heart_rate is replaced by non-numeric text
    pub corrupt_rate: f64,
}

impl HealthOptions {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            start_year,
            end_year,
            corrupt_rate: 0.0,
        }
    }

    pub fn corrupt_rate(mut self, rate: f64) -> Self {
        self.corrupt_rate = rate;
        self
    }

    fn validate(&self) -> vitals_common::Result<()> {
        if self.end_year < self.start_year {
            return Err(VitalsError::Config(format!(
                "end year {} is before start year {}",
                self.end_year, self.start_year
            )));
        }
        if !(0.0..=1.0).contains(&self.corrupt_rate) {
            return Err(VitalsError::Config(format!(
                "corrupt rate must be between 0 and 1, got {}",
                self.corrupt_rate
            )));
        }
        Ok(())
    }
}

fn days_in(partition: Partition) -> impl Iterator<Item = NaiveDate> {
    let first = NaiveDate::from_ymd_opt(partition.year, partition.month, 1);
    first
        .into_iter()
        .flat_map(|first| first.iter_days())
        .take_while(move |day| day.month() == partition.month)
}

fn next_weight<R: Rng + ?Sized>(rng: &mut R, previous: f64) -> f64 {
    let change = rng.gen_range(-MAX_DAILY_WEIGHT_CHANGE..=MAX_DAILY_WEIGHT_CHANGE);
    (previous * (1.0 + change) * 10.0).round() / 10.0
}

/// Write `<out_dir>/<year>/health_data_<year><mm>.csv` for every month in the
/// range, with one row per patient per day. Returns the written paths in order.
pub fn generate_health<R: Rng + ?Sized>(
    rng: &mut R,
    patients: &[Patient],
    options: HealthOptions,
    out_dir: &Path,
) -> EtlResult<Vec<PathBuf>> {
    options.validate()?;

    let mut weights: HashMap<&str, f64> = patients
        .iter()
        .map(|p| (p.id.as_str(), f64::from(p.start_weight)))
        .collect();
    let mut written = Vec::new();

    for year in options.start_year..=options.end_year {
        let dir = out_dir.join(year.to_string());
        std::fs::create_dir_all(&dir).map_err(|e| EtlError::io(&dir, e))?;

        for partition in Partition::months_of(year) {
            let path = dir.join(partition.file_name());
            let mut writer = csv::Writer::from_path(&path).map_err(|e| EtlError::csv(&path, e))?;
            let mut rows = 0usize;

            for day in days_in(partition) {
                for patient in patients {
                    let weight = weights.entry(patient.id.as_str()).or_default();
                    *weight = next_weight(rng, *weight);

                    let corrupt = options.corrupt_rate > 0.0 && rng.gen_bool(options.corrupt_rate);
                    let heart_rate = if corrupt {
                        CORRUPT_VALUES[rng.gen_range(0..CORRUPT_VALUES.len())].to_string()
                    } else {
                        rng.gen_range(60..=100).to_string()
                    };

                    let row = RawHealthRow {
                        patient_id: patient.id.clone(),
                        heart_rate,
                        weight: format!("{:.1}", weight),
                        systolic: rng.gen_range(100..=180).to_string(),
                        diastolic: rng.gen_range(60..=110).to_string(),
                        record_date: day.format("%Y-%m-%d").to_string(),
                    };
                    writer.serialize(&row).map_err(|e| EtlError::csv(&path, e))?;
                    rows += 1;
                }
            }

            writer.flush().map_err(|e| EtlError::io(&path, e))?;
            debug!(path = %path.display(), rows, "Saved monthly vitals");
            written.push(path);
        }
    }

    info!(
        files = written.len(),
        patients = patients.len(),
        "Generated health data for {}-{}",
        options.start_year,
        options.end_year
    );
    Ok(written)
}
