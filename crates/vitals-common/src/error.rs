//! Error types shared across the vitals workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, VitalsError>;

/// Main error type for shared vitals functionality
#[derive(Error, Debug)]
pub enum VitalsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid partition: {0}")]
    InvalidPartition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
