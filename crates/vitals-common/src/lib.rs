//! Vitals Common Library
//!
//! Shared domain types, error handling and logging for the vitals ETL workspace.
//!
//! # Overview
//!
//! - **Types**: health records, quarantine records, partitions and the column
//!   layout shared by source files, staging artifacts and store tables
//! - **Error Handling**: common error type and result alias
//! - **Logging**: tracing subscriber setup driven by environment variables
//!
//! # Example
//!
//! ```no_run
//! use vitals_common::types::Partition;
//!
//! fn expected_files(year: i32) -> vitals_common::Result<Vec<String>> {
//!     Ok(Partition::months_of(year).map(|p| p.file_name()).collect())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, VitalsError};
