//! Patient roster generation

use chrono::{Datelike, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;
use vitals_common::VitalsError;

use crate::error::{EtlError, EtlResult};

const SURNAMES: [&str; 16] = [
    "Smith", "Johnson", "Williams", "Brown", "Garcia", "Miller", "Davis", "Martinez",
    "Lopez", "Wilson", "Anderson", "Thomas", "Moore", "Jackson", "Nguyen", "Walker",
];

const GENDERS: [&str; 3] = ["M", "F", "X"];

const LOCATIONS: [(&str, &str); 10] = [
    ("Springfield", "Illinois"),
    ("Portland", "Oregon"),
    ("Austin", "Texas"),
    ("Madison", "Wisconsin"),
    ("Columbus", "Ohio"),
    ("Raleigh", "North Carolina"),
    ("Boise", "Idaho"),
    ("Albany", "New York"),
    ("Tucson", "Arizona"),
    ("Savannah", "Georgia"),
];

/// Date every generated patient was created, and the reference for ages
pub fn roster_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2014, 1, 1).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patient {
    pub id: String,
    pub birthdate: NaiveDate,
    pub gender: String,
    pub city: String,
    pub state: String,
    pub height: u32,
    pub start_weight: u32,
    pub start_systolic: u32,
    pub start_diastolic: u32,
    pub create_date: NaiveDate,
    pub updated_date: NaiveDate,
}

/// Number of distinct ids `patient_id` can produce
pub fn id_capacity() -> usize {
    let prefixes: HashSet<String> = SURNAMES
        .iter()
        .map(|s| s.chars().take(2).collect::<String>().to_uppercase())
        .collect();
    prefixes.len() * 100_000 * 26
}

/// Two letters from a surname, five digits, one letter
fn patient_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let surname = SURNAMES.choose(rng).copied().unwrap_or("Doe");
    let mut id: String = surname.chars().take(2).collect::<String>().to_uppercase();
    for _ in 0..5 {
        id.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    id.push(char::from(b'A' + rng.gen_range(0..26u8)));
    id
}

fn birthdate<R: Rng + ?Sized>(rng: &mut R, as_of: NaiveDate) -> NaiveDate {
    let age = rng.gen_range(25..=105);
    let day_of_year = rng.gen_range(0..365);
    NaiveDate::from_ymd_opt(as_of.year() - age, 1, 1)
        .and_then(|start| start.checked_add_days(chrono::Days::new(day_of_year)))
        .unwrap_or(as_of)
}

/// Generate `count` patients with unique ids.
///
/// Fails up front when `count` exceeds [`id_capacity`].
pub fn generate_patients<R: Rng + ?Sized>(rng: &mut R, count: usize) -> EtlResult<Vec<Patient>> {
    let capacity = id_capacity();
    if count > capacity {
        return Err(VitalsError::Config(format!(
            "cannot generate {} patients with unique ids, at most {} are possible",
            count, capacity
        ))
        .into());
    }

    let created = roster_date();
    let mut seen = HashSet::with_capacity(count);
    let mut patients = Vec::with_capacity(count);

    while patients.len() < count {
        let id = patient_id(rng);
        if !seen.insert(id.clone()) {
            continue;
        }

        let (city, state) = LOCATIONS.choose(rng).copied().unwrap_or(LOCATIONS[0]);
        patients.push(Patient {
            id,
            birthdate: birthdate(rng, created),
            gender: GENDERS.choose(rng).copied().unwrap_or("X").to_string(),
            city: city.to_string(),
            state: state.to_string(),
            height: rng.gen_range(60..=76),
            start_weight: rng.gen_range(125..=300),
            start_systolic: rng.gen_range(100..=180),
            start_diastolic: rng.gen_range(60..=110),
            create_date: created,
            updated_date: created,
        });
    }

    info!(count = patients.len(), "Generated patients");
    Ok(patients)
}

/// Write the roster as a headed CSV, creating parent directories.
pub fn write_patients(path: &Path, patients: &[Patient]) -> EtlResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| EtlError::io(parent, e))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| EtlError::csv(path, e))?;
    for patient in patients {
        writer.serialize(patient).map_err(|e| EtlError::csv(path, e))?;
    }
    writer.flush().map_err(|e| EtlError::io(path, e))?;

    info!(path = %path.display(), "Saved patient roster");
    Ok(())
}
