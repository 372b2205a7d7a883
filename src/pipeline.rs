//! The cleaning job: fetch → load → filter → normalize → filter → write →
//! publish → clean up.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use tempfile::TempDir;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::data::{
    filter_bounding_box, filter_range, load_csv, normalize_datetime, write_csv, GeoBoundingBox,
};
use crate::error::{CleaningError, Result};
use crate::registry::{ArtifactRegistry, PublishedArtifact};

/// Job type recorded with every run.
pub const JOB_TYPE: &str = "basic_cleaning";

pub const PRICE_COLUMN: &str = "price";
pub const LAST_REVIEW_COLUMN: &str = "last_review";

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Loaded,
    PriceFiltered,
    DatetimeNormalized,
    GeoFiltered,
    Written,
    Published,
    CleanedUp,
    Done,
    Failed,
}

impl Stage {
    /// The step that produces this state.
    pub fn step(&self) -> &'static str {
        match self {
            Stage::Fetching => "fetch",
            Stage::Loaded => "load",
            Stage::PriceFiltered => "price filter",
            Stage::DatetimeNormalized => "datetime normalization",
            Stage::GeoFiltered => "geo filter",
            Stage::Written => "write",
            Stage::Published => "publish",
            Stage::CleanedUp => "cleanup",
            Stage::Done => "finish",
            Stage::Failed => "failure",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A component error tagged with the step it came from.
#[derive(Error, Debug)]
#[error("{} step failed", .stage.step())]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: CleaningError,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub rows_loaded: usize,
    pub rows_written: usize,
    pub published: PublishedArtifact,
}

// ---------------------------------------------------------------------------
// Temporary output
// ---------------------------------------------------------------------------

/// The written CSV, living in a fresh private directory until publish is done.
///
/// Dropping it removes the directory silently; [`StagedOutput::cleanup`]
/// reports failures.
pub struct StagedOutput {
    dir: TempDir,
    path: PathBuf,
}

impl StagedOutput {
    pub fn create(work_dir: &Path, file_name: &str) -> Result<Self> {
        fs::create_dir_all(work_dir).map_err(|e| CleaningError::io(work_dir, e))?;
        let dir = tempfile::Builder::new()
            .prefix("basic_cleaning-")
            .tempdir_in(work_dir)
            .map_err(|e| CleaningError::io(work_dir, e))?;
        let path = dir.path().join(file_name);
        Ok(StagedOutput { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cleanup(self) -> io::Result<()> {
        self.dir.close()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives one run. Not reusable: a second `run` call is rejected.
pub struct Orchestrator<R> {
    config: PipelineConfig,
    registry: R,
    work_dir: PathBuf,
    state: Stage,
}

impl<R: ArtifactRegistry> Orchestrator<R> {
    pub fn new(config: PipelineConfig, registry: R, work_dir: impl Into<PathBuf>) -> Self {
        Orchestrator {
            config,
            registry,
            work_dir: work_dir.into(),
            state: Stage::Fetching,
        }
    }

    pub fn state(&self) -> Stage {
        self.state
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn run(&mut self) -> std::result::Result<RunSummary, PipelineError> {
        if self.state != Stage::Fetching {
            return Err(PipelineError {
                stage: self.state,
                source: CleaningError::Config("orchestrator has already run".into()),
            });
        }

        let run_config = self.config.to_run_config();
        let recorded = self.registry.record_config(&run_config);
        self.advance(Stage::Fetching, recorded.map_err(CleaningError::from))?;

        info!("Fetching data artifact {} from the registry", self.config.input_artifact);
        let fetched = self.registry.fetch(&self.config.input_artifact);
        let input_path = self.advance(Stage::Fetching, fetched.map_err(CleaningError::from))?;
        info!("Data artifact fetched successfully");

        let raw = self.advance(Stage::Loaded, load_csv(&input_path))?;
        let rows_loaded = raw.len();
        info!("Loaded {rows_loaded} rows from {}", input_path.display());

        let range = self.config.price_range;
        let priced = self.advance(
            Stage::PriceFiltered,
            filter_range(&raw, PRICE_COLUMN, &range),
        )?;
        info!(
            "Dropped {} rows with price outside [{}, {}]",
            raw.len() - priced.len(),
            range.min(),
            range.max()
        );

        let normalized = self.advance(
            Stage::DatetimeNormalized,
            normalize_datetime(&priced, LAST_REVIEW_COLUMN),
        )?;

        let located = self.advance(
            Stage::GeoFiltered,
            filter_bounding_box(&normalized, &GeoBoundingBox::NYC),
        )?;
        info!(
            "Dropped {} rows outside the NYC bounding box",
            normalized.len() - located.len()
        );

        let staged = self.advance(
            Stage::Written,
            StagedOutput::create(&self.work_dir, &self.config.output_artifact),
        )?;
        let written = write_csv(&located, staged.path());
        self.advance(Stage::Written, written)?;
        info!("Wrote {} rows to {}", located.len(), staged.path().display());

        let metadata = self.config.output_metadata();
        let published = match self.registry.publish(staged.path(), &metadata) {
            Ok(published) => published,
            Err(err) => {
                let staged_path = staged.path().to_path_buf();
                if let Err(cleanup_err) = staged.cleanup() {
                    warn!(
                        "Could not remove temporary output {}: {cleanup_err}",
                        staged_path.display()
                    );
                }
                return Err(self.fail(Stage::Published, err.into()));
            }
        };
        self.enter(Stage::Published);

        let staged_path = staged.path().to_path_buf();
        let cleaned = staged
            .cleanup()
            .map_err(|e| CleaningError::io(&staged_path, e));
        self.advance(Stage::CleanedUp, cleaned)?;

        self.enter(Stage::Done);
        info!("Published {published}");
        Ok(RunSummary {
            rows_loaded,
            rows_written: located.len(),
            published,
        })
    }

    fn advance<T>(
        &mut self,
        next: Stage,
        result: Result<T>,
    ) -> std::result::Result<T, PipelineError> {
        match result {
            Ok(value) => {
                self.enter(next);
                Ok(value)
            }
            Err(source) => Err(self.fail(next, source)),
        }
    }

    fn enter(&mut self, next: Stage) {
        if self.state != next {
            info!("{} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn fail(&mut self, stage: Stage, source: CleaningError) -> PipelineError {
        error!("{} step failed: {source}", stage.step());
        self.state = Stage::Failed;
        PipelineError { stage, source }
    }
}
