//! Run parameters for the cleaning job.

use serde_json::json;

use crate::data::FilterRange;
use crate::error::{CleaningError, Result};
use crate::registry::{is_valid_name, ArtifactMetadata, ArtifactRef};

/// Everything one run needs, validated once at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Raw dataset to fetch.
    pub input_artifact: ArtifactRef,
    /// Name of the cleaned artifact; also the file name it is published as.
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    /// Accepted `price` interval.
    pub price_range: FilterRange,
}

impl PipelineConfig {
    pub fn new(
        input_artifact: ArtifactRef,
        output_artifact: impl Into<String>,
        output_type: impl Into<String>,
        output_description: impl Into<String>,
        min_price: f64,
        max_price: f64,
    ) -> Result<Self> {
        let output_artifact = output_artifact.into();
        if !is_valid_name(&output_artifact) {
            return Err(CleaningError::Config(format!(
                "output artifact '{output_artifact}' must be a plain file name"
            )));
        }
        let output_type = output_type.into();
        if output_type.trim().is_empty() {
            return Err(CleaningError::Config("output type must not be empty".into()));
        }

        Ok(PipelineConfig {
            input_artifact,
            output_artifact,
            output_type,
            output_description: output_description.into(),
            price_range: FilterRange::new(min_price, max_price)?,
        })
    }

    /// Metadata attached to the published artifact.
    pub fn output_metadata(&self) -> ArtifactMetadata {
        ArtifactMetadata {
            name: self.output_artifact.clone(),
            artifact_type: self.output_type.clone(),
            description: self.output_description.clone(),
        }
    }

    /// Flat mapping recorded against the run, keyed like the CLI flags.
    pub fn to_run_config(&self) -> serde_json::Value {
        json!({
            "input_artifact": self.input_artifact.to_string(),
            "output_artifact": self.output_artifact,
            "output_type": self.output_type,
            "output_description": self.output_description,
            "min_price": self.price_range.min(),
            "max_price": self.price_range.max(),
        })
    }
}
