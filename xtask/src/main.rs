//! Build automation tasks for the vitals ETL workspace

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for vitals-etl", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference as Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<vitals_etl::cli::Cli>();

    let content = format!(
        r#"# vitals-etl CLI Reference

Generated from the CLI source on {}.

## Quick Start

```bash
# Synthesize 50 patients with two years of daily vitals
vitals-etl generate --patients 50 --start-year 2014 --end-year 2015 --seed 7

# Load everything into PostgreSQL
POSTGRES_USER=etl POSTGRES_DB=health vitals-etl run

# See which monthly files are present
vitals-etl discover
```

## Commands

{}

## Environment Variables

- `POSTGRES_USER`, `POSTGRES_DB` - required for `run`
- `POSTGRES_PASSWORD` - optional, empty if unset
- `POSTGRES_HOST` / `POSTGRES_PORT` - default `postgres:5432`
- `DB_CONNECT_TIMEOUT` - seconds, default `30`
- `VITALS_HEALTH_DATA_DIR` - default `health_data`
- `VITALS_PATIENT_FILE` - default `data/patients.csv`
- `VITALS_KEEP_FAILED_STAGING` - keep `_temp.csv` artifacts of failed loads, default `true`
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`, `LOG_FILTER` - logging
- `RUST_LOG` - extra filter directives

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());
    Ok(())
}
