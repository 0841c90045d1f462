//! Vitals ETL Library
//!
//! Loads year/month-partitioned patient vitals CSVs into PostgreSQL. Rows that
//! fail type coercion are quarantined with a reason instead of being loaded, and
//! one bad file never stops the others.
//!
//! # Pipeline
//!
//! 1. Ensure the `health_stats` and quarantine tables exist
//! 2. Replace the `patients` table from the roster CSV
//! 3. For every `health_data/<year>/health_data_<year><mm>.csv`: validate rows,
//!    quarantine failures, write a staging artifact, bulk-copy it in
//! 4. Report missing files and the final row count
//!
//! # Example
//!
//! ```no_run
//! use vitals_etl::{config::EtlConfig, pipeline::run_etl};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EtlConfig::load()?;
//!     let report = run_etl(&config).await?;
//!     tracing::info!("{}", report.summary());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cli;
pub mod config;
pub mod db;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod patients;
pub mod pipeline;
pub mod preprocess;
pub mod store;
pub mod synth;
pub mod validate;

pub use error::{EtlError, EtlResult};
pub use pipeline::{run_etl, EtlPipeline, RunReport};
