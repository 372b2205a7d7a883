//! Publish a local file to the artifact registry, e.g. to seed the raw dataset
//! the cleaning step fetches.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use basic_cleaning::{ArtifactMetadata, ArtifactRegistry, LocalRegistry};

#[derive(Parser)]
#[command(name = "log_artifact", about = "Upload a file as a registry artifact")]
struct Args {
    /// File to publish
    file: PathBuf,

    /// Artifact name (defaults to the file name)
    #[arg(long = "artifact_name")]
    artifact_name: Option<String>,

    #[arg(long = "artifact_type", default_value = "raw_data")]
    artifact_type: String,

    #[arg(long = "artifact_description", default_value = "")]
    artifact_description: String,

    /// Root directory of the artifact registry
    #[arg(long = "registry_dir", default_value = "artifacts")]
    registry_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let name = match args.artifact_name {
        Some(name) => name,
        None => args
            .file
            .file_name()
            .and_then(|f| f.to_str())
            .map(str::to_string)
            .context("file path has no file name")?,
    };

    let mut registry = LocalRegistry::init(&args.registry_dir, "upload")
        .with_context(|| format!("opening registry at {}", args.registry_dir.display()))?;
    let metadata = ArtifactMetadata {
        name,
        artifact_type: args.artifact_type,
        description: args.artifact_description,
    };
    let published = registry
        .publish(&args.file, &metadata)
        .with_context(|| format!("publishing {}", args.file.display()))?;

    println!("{published} ({})", published.digest);
    Ok(())
}
