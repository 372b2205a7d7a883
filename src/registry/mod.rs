//! Artifact registry: where raw datasets come from and clean ones go.
//!
//! The pipeline only talks to the [`ArtifactRegistry`] trait. [`LocalRegistry`]
//! implements it on a plain directory tree.

pub mod local;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CleaningError;

pub use local::LocalRegistry;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("artifact '{0}' not found")]
    NotFound(String),

    #[error("artifact '{name}' has no version {version}")]
    UnknownVersion { name: String, version: String },

    #[error("invalid artifact name '{0}'")]
    InvalidName(String),

    #[error("artifact '{name}' version v{version} already exists")]
    Conflict { name: String, version: u32 },

    #[error("artifact '{reference}' is corrupt: expected digest {expected}, found {actual}")]
    DigestMismatch {
        reference: String,
        expected: String,
        actual: String,
    },

    #[error("registry I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("registry metadata error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RegistryError::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// References and metadata
// ---------------------------------------------------------------------------

/// Which version of an artifact to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionSpec {
    Latest,
    Number(u32),
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Latest => write!(f, "latest"),
            VersionSpec::Number(n) => write!(f, "v{n}"),
        }
    }
}

/// `name:version` handle on a registry entry. A bare `name` means `name:latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub version: VersionSpec,
}

impl ArtifactRef {
    pub fn parse(s: &str) -> Result<Self, CleaningError> {
        let invalid = || CleaningError::Config(format!("invalid artifact reference '{s}'"));

        let (name, version) = match s.rsplit_once(':') {
            Some((name, version)) => (name, version),
            None => (s, "latest"),
        };
        if !is_valid_name(name) {
            return Err(invalid());
        }

        let version = if version == "latest" {
            VersionSpec::Latest
        } else {
            let n = version
                .strip_prefix('v')
                .and_then(|n| n.parse::<u32>().ok())
                .ok_or_else(invalid)?;
            VersionSpec::Number(n)
        };

        Ok(ArtifactRef {
            name: name.to_string(),
            version,
        })
    }
}

impl FromStr for ArtifactRef {
    type Err = CleaningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactRef::parse(s)
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Name, type tag and description attached to a published file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub description: String,
}

/// What the registry assigned to a publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedArtifact {
    pub name: String,
    pub version: u32,
    pub digest: String,
}

impl fmt::Display for PublishedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:v{}", self.name, self.version)
    }
}

/// Artifact names are single path components without the `:` separator.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains(['/', '\\', ':'])
}

// ---------------------------------------------------------------------------
// The registry seam
// ---------------------------------------------------------------------------

/// Operations the pipeline needs from an artifact registry.
///
/// Calls block and are not retried. `publish` is all-or-nothing: the new
/// version either appears complete with its metadata or not at all.
pub trait ArtifactRegistry {
    /// Attach the resolved run configuration to the current run.
    fn record_config(&mut self, config: &serde_json::Value) -> Result<(), RegistryError>;

    /// Resolve `reference` and return a local path to its file.
    fn fetch(&mut self, reference: &ArtifactRef) -> Result<PathBuf, RegistryError>;

    /// Store the file at `path` as a new version of `metadata.name`.
    fn publish(
        &mut self,
        path: &Path,
        metadata: &ArtifactMetadata,
    ) -> Result<PublishedArtifact, RegistryError>;
}

impl<R: ArtifactRegistry + ?Sized> ArtifactRegistry for &mut R {
    fn record_config(&mut self, config: &serde_json::Value) -> Result<(), RegistryError> {
        (**self).record_config(config)
    }

    fn fetch(&mut self, reference: &ArtifactRef) -> Result<PathBuf, RegistryError> {
        (**self).fetch(reference)
    }

    fn publish(
        &mut self,
        path: &Path,
        metadata: &ArtifactMetadata,
    ) -> Result<PublishedArtifact, RegistryError> {
        (**self).publish(path, metadata)
    }
}
