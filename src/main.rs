use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use basic_cleaning::{ArtifactRef, LocalRegistry, Orchestrator, PipelineConfig, JOB_TYPE};

/// A very basic data cleaning
#[derive(Parser)]
#[command(name = "basic-cleaning", version)]
struct Cli {
    /// Registry artifact to clean, as `name:version`
    #[arg(long = "input_artifact")]
    input_artifact: ArtifactRef,

    /// Name of the cleaned artifact produced by this step
    #[arg(long = "output_artifact")]
    output_artifact: String,

    /// Type tag of the produced artifact
    #[arg(long = "output_type")]
    output_type: String,

    /// Description of the artifact created after this cleaning step
    #[arg(long = "output_description")]
    output_description: String,

    /// Lower threshold for the price column
    #[arg(long = "min_price", allow_negative_numbers = true)]
    min_price: f64,

    /// Upper threshold for the price column
    #[arg(long = "max_price", allow_negative_numbers = true)]
    max_price: f64,

    /// Root directory of the artifact registry
    #[arg(long = "registry_dir", default_value = "artifacts")]
    registry_dir: PathBuf,

    /// Where the temporary output is staged before publishing
    #[arg(long = "work_dir")]
    work_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(buf, "{} {}", buf.timestamp_millis(), record.args())
        })
        .init();

    let cli = Cli::parse();

    let config = PipelineConfig::new(
        cli.input_artifact,
        cli.output_artifact,
        cli.output_type,
        cli.output_description,
        cli.min_price,
        cli.max_price,
    )
    .context("invalid arguments")?;

    let registry = LocalRegistry::init(&cli.registry_dir, JOB_TYPE)
        .with_context(|| format!("opening registry at {}", cli.registry_dir.display()))?;
    let work_dir = cli.work_dir.unwrap_or_else(std::env::temp_dir);

    let summary = Orchestrator::new(config, registry, work_dir).run()?;
    log::info!(
        "Done: {} of {} rows kept, published {}",
        summary.rows_written,
        summary.rows_loaded,
        summary.published
    );

    Ok(())
}
