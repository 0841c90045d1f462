//! Command-line interface definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vitals-etl")]
#[command(author, version, about = "Patient vitals ETL into PostgreSQL", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full ETL: schema, patients, then every monthly vitals file
    Run {
        /// Root of the year-partitioned vitals files, overriding the configured path
        #[arg(long)]
        health_dir: Option<PathBuf>,

        /// Patient roster CSV, overriding the configured path
        #[arg(long)]
        patient_file: Option<PathBuf>,
    },

    /// Generate a synthetic patient roster and daily vitals history
    Generate {
        /// Number of patients
        #[arg(short, long, default_value = "100")]
        patients: usize,

        /// First year of vitals
        #[arg(long, default_value = "2014")]
        start_year: i32,

        /// Last year of vitals (inclusive)
        #[arg(long, default_value = "2014")]
        end_year: i32,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Fraction of rows given an unparseable heart rate
        #[arg(long, default_value = "0.0")]
        corrupt_rate: f64,

        /// Output directory for the vitals partitions
        #[arg(short, long, default_value = crate::config::DEFAULT_HEALTH_DATA_DIR)]
        out: PathBuf,

        /// Output path for the patient roster
        #[arg(long, default_value = crate::config::DEFAULT_PATIENT_FILE)]
        patient_file: PathBuf,
    },

    /// List expected monthly files and whether each is present
    Discover {
        /// Root of the year-partitioned vitals files
        #[arg(long, env = "VITALS_HEALTH_DATA_DIR", default_value = crate::config::DEFAULT_HEALTH_DATA_DIR)]
        health_dir: PathBuf,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_paths_fall_back_to_config() {
        let cli = Cli::parse_from(["vitals-etl", "run"]);
        match cli.command {
            Commands::Run {
                health_dir,
                patient_file,
            } => {
                assert_eq!(health_dir, None);
                assert_eq!(patient_file, None);
            },
            other => panic!("unexpected command {other:?}"),
        }

        let command = Cli::command();
        let run = command.find_subcommand("run").unwrap();
        for arg in run.get_arguments() {
            assert!(arg.get_env().is_none());
            let help = arg.get_help().map(|h| h.to_string()).unwrap_or_default();
            assert!(!help.contains("[default"), "{help}");
        }
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from([
            "vitals-etl",
            "-v",
            "generate",
            "--patients",
            "5",
            "--start-year",
            "2014",
            "--end-year",
            "2015",
            "--seed",
            "9",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Generate {
                patients,
                start_year,
                end_year,
                seed,
                ..
            } => {
                assert_eq!(patients, 5);
                assert_eq!((start_year, end_year), (2014, 2015));
                assert_eq!(seed, Some(9));
            },
            other => panic!("unexpected command {other:?}"),
        }
    }
}
