//! Table definitions for the ingestion store

/// Validated, metadata-enriched health rows.
pub const CREATE_HEALTH_STATS: &str = r#"
CREATE TABLE IF NOT EXISTS health_stats (
    patient_id CHAR(8) NOT NULL,
    heart_rate INTEGER,
    weight REAL,
    systolic INTEGER,
    diastolic INTEGER,
    record_date DATE,
    ingested_at TIMESTAMP,
    source_file TEXT
)
"#;

/// Rows that failed validation, with the reason.
pub const CREATE_QUARANTINE: &str = r#"
CREATE TABLE IF NOT EXISTS health_stats_staging_errors (
    patient_id CHAR(8) NOT NULL,
    heart_rate INTEGER,
    weight REAL,
    systolic INTEGER,
    diastolic INTEGER,
    record_date DATE,
    ingested_at TIMESTAMP,
    source_file TEXT,
    error TEXT
)
"#;

/// Statements run by schema setup, in order. Each is safe to rerun.
pub const SCHEMA_STATEMENTS: [&str; 2] = [CREATE_HEALTH_STATS, CREATE_QUARANTINE];

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
