//! Synthetic patient and vitals data
//!
//! Produces a patient roster and a daily vitals history partitioned the same
//! way the pipeline expects to find it. Every generator takes its RNG as an
//! argument, so a fixed seed reproduces the same data set.

pub mod health;
pub mod patients;

pub use health::{generate_health, HealthOptions};
pub use patients::{generate_patients, write_patients, Patient};

use rand::rngs::StdRng;
use rand::SeedableRng;

/// RNG for a generator run; `None` draws a seed from the OS.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
