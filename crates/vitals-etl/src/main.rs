//! Vitals ETL - command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use vitals_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use vitals_etl::cli::{Cli, Commands};
use vitals_etl::config::EtlConfig;
use vitals_etl::discovery;
use vitals_etl::pipeline::{run_etl, FileOutcome};
use vitals_etl::synth::{self, HealthOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .output(LogOutput::Console)
        .log_file_prefix("vitals-etl")
        .build();

    let log_config = with_env_overrides(log_config);

    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        },
    };

    match execute(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        },
    }
}

async fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            health_dir,
            patient_file,
        } => run(health_dir, patient_file).await,

        Commands::Generate {
            patients,
            start_year,
            end_year,
            seed,
            corrupt_rate,
            out,
            patient_file,
        } => {
            let options = HealthOptions::new(start_year, end_year).corrupt_rate(corrupt_rate);
            tokio::task::spawn_blocking(move || -> Result<()> {
                let mut rng = synth::rng_from_seed(seed);
                let roster = synth::generate_patients(&mut rng, patients)?;
                synth::write_patients(&patient_file, &roster)?;
                synth::generate_health(&mut rng, &roster, options, &out)?;
                Ok(())
            })
            .await
            .context("generator task panicked")?
        },

        Commands::Discover { health_dir } => discover(health_dir),
    }
}

async fn run(health_dir: Option<PathBuf>, patient_file: Option<PathBuf>) -> Result<()> {
    let mut config = EtlConfig::load().context("Failed to load configuration")?;
    if let Some(dir) = health_dir {
        config.paths.health_data_dir = dir;
    }
    if let Some(file) = patient_file {
        config.paths.patient_file = file;
    }

    let report = run_etl(&config).await?;

    for file in report.failed_files() {
        if let FileOutcome::Failed {
            reason,
            retained_staging,
            ..
        } = &file.outcome
        {
            warn!(
                file = %file.path.display(),
                staging = ?retained_staging,
                "Not loaded: {}",
                reason
            );
        }
    }
    info!("{}", report.summary());

    Ok(())
}

/// Environment variables take precedence over the flags. An unparsable value
/// is reported and the flag-derived config is kept.
fn with_env_overrides(log_config: LogConfig) -> LogConfig {
    match log_config.clone().merge_env() {
        Ok(merged) => merged,
        Err(e) => {
            eprintln!("Warning: ignoring logging environment: {:#}", e);
            log_config
        },
    }
}

fn discover(health_dir: PathBuf) -> Result<()> {
    let files = discovery::plan(&health_dir)?;
    if files.is_empty() {
        println!("No partition years under {}", health_dir.display());
        return Ok(());
    }

    let mut current_year = None;
    for file in &files {
        if current_year != Some(file.partition.year) {
            current_year = Some(file.partition.year);
            println!("{}", file.partition.year);
        }
        let status = if file.exists() { "present" } else { "missing" };
        println!("  {:<28} {}", file.file_name, status);
    }

    let present = files.iter().filter(|f| f.exists()).count();
    println!("{} of {} expected files present", present, files.len());
    Ok(())
}
