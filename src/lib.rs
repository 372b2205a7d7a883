//! Basic cleaning stage of the listings pipeline.
//!
//! Fetches a raw listings CSV from an artifact registry, drops price and
//! location outliers, normalizes `last_review` to datetimes and publishes the
//! result as a new artifact version.
//!
//! ```no_run
//! use basic_cleaning::{ArtifactRef, LocalRegistry, Orchestrator, PipelineConfig, JOB_TYPE};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = PipelineConfig::new(
//!     ArtifactRef::parse("sample.csv:latest")?,
//!     "clean_sample.csv",
//!     "clean_sample",
//!     "Data with outliers and null values removed",
//!     10.0,
//!     350.0,
//! )?;
//! let registry = LocalRegistry::init("artifacts", JOB_TYPE)?;
//! let summary = Orchestrator::new(config, registry, std::env::temp_dir()).run()?;
//! println!("published {}", summary.published);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use config::PipelineConfig;
pub use error::{CleaningError, Result};
pub use pipeline::{Orchestrator, PipelineError, RunSummary, Stage, JOB_TYPE};
pub use registry::{
    ArtifactMetadata, ArtifactRef, ArtifactRegistry, LocalRegistry, PublishedArtifact,
    RegistryError,
};
