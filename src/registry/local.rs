use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{
    is_valid_name, ArtifactMetadata, ArtifactRef, ArtifactRegistry, PublishedArtifact,
    RegistryError, VersionSpec,
};

const MANIFEST_FILE: &str = "manifest.json";
const RUN_FILE: &str = "run.json";

/// Runs started by this process; keeps ids unique within one timestamp tick.
static RUN_SEQ: AtomicU32 = AtomicU32::new(0);

/// Stored next to every artifact version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(flatten)]
    pub metadata: ArtifactMetadata,
    pub version: u32,
    pub file: String,
    pub digest: String,
    pub created_at: DateTime<Utc>,
    pub run_id: String,
}

/// Provenance for one run: its config and the artifacts it touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub job_type: String,
    pub started_at: DateTime<Utc>,
    pub config: serde_json::Map<String, serde_json::Value>,
    pub used: Vec<String>,
    pub logged: Vec<String>,
}

/// Registry on the local filesystem.
///
/// Layout:
/// ```text
/// <root>/artifacts/<name>/v<N>/<file>
/// <root>/artifacts/<name>/v<N>/manifest.json
/// <root>/runs/<run_id>/run.json
/// ```
/// Each `LocalRegistry` value is bound to a single run.
pub struct LocalRegistry {
    root: PathBuf,
    run: RunRecord,
}

impl LocalRegistry {
    /// Open (creating if needed) the registry at `root` and start a run.
    pub fn init(root: impl Into<PathBuf>, job_type: &str) -> Result<Self, RegistryError> {
        let root = root.into();
        let started_at = Utc::now();
        let id = format!(
            "{job_type}-{}-{}-{}",
            started_at.format("%Y%m%dT%H%M%S%.6f"),
            std::process::id(),
            RUN_SEQ.fetch_add(1, Ordering::Relaxed)
        );

        let registry = LocalRegistry {
            root,
            run: RunRecord {
                id,
                job_type: job_type.to_string(),
                started_at,
                config: serde_json::Map::new(),
                used: Vec::new(),
                logged: Vec::new(),
            },
        };
        fs::create_dir_all(registry.artifacts_dir())
            .map_err(|e| RegistryError::io(registry.artifacts_dir(), e))?;
        registry.save_run()?;

        info!("Started run {} in registry {}", registry.run.id, registry.root.display());
        Ok(registry)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run(&self) -> &RunRecord {
        &self.run
    }

    /// Read the manifest of a stored version.
    pub fn manifest(&self, name: &str, version: u32) -> Result<Manifest, RegistryError> {
        let path = self.version_dir(name, version).join(MANIFEST_FILE);
        let text = fs::read_to_string(&path).map_err(|e| RegistryError::io(&path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Highest stored version of `name`, if any.
    pub fn latest_version(&self, name: &str) -> Result<Option<u32>, RegistryError> {
        let dir = self.artifact_dir(name);
        if !dir.is_dir() {
            return Ok(None);
        }
        let entries = fs::read_dir(&dir).map_err(|e| RegistryError::io(&dir, e))?;

        let mut latest = None;
        for entry in entries {
            let entry = entry.map_err(|e| RegistryError::io(&dir, e))?;
            let file_name = entry.file_name();
            let Some(n) = file_name
                .to_str()
                .and_then(|s| s.strip_prefix('v'))
                .and_then(|n| n.parse::<u32>().ok())
            else {
                continue;
            };
            latest = latest.max(Some(n));
        }
        Ok(latest)
    }

    fn artifacts_dir(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.artifacts_dir().join(name)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.artifact_dir(name).join(format!("v{version}"))
    }

    fn save_run(&self) -> Result<(), RegistryError> {
        let dir = self.root.join("runs").join(&self.run.id);
        fs::create_dir_all(&dir).map_err(|e| RegistryError::io(&dir, e))?;
        let path = dir.join(RUN_FILE);
        let body = serde_json::to_string_pretty(&self.run)?;
        fs::write(&path, body).map_err(|e| RegistryError::io(&path, e))
    }

    fn resolve(&self, reference: &ArtifactRef) -> Result<u32, RegistryError> {
        if !is_valid_name(&reference.name) || !self.artifact_dir(&reference.name).is_dir() {
            return Err(RegistryError::NotFound(reference.name.clone()));
        }
        let unknown = || RegistryError::UnknownVersion {
            name: reference.name.clone(),
            version: reference.version.to_string(),
        };
        match reference.version {
            VersionSpec::Latest => self.latest_version(&reference.name)?.ok_or_else(unknown),
            VersionSpec::Number(n) if self.version_dir(&reference.name, n).is_dir() => Ok(n),
            VersionSpec::Number(_) => Err(unknown()),
        }
    }

    /// Move a fully written staging directory into place as `version`.
    fn commit(&self, staging: &Path, name: &str, version: u32) -> Result<(), RegistryError> {
        let target = self.version_dir(name, version);
        if target.exists() {
            return Err(RegistryError::Conflict {
                name: name.to_string(),
                version,
            });
        }
        fs::rename(staging, &target).map_err(|e| {
            if target.exists() {
                RegistryError::Conflict {
                    name: name.to_string(),
                    version,
                }
            } else {
                RegistryError::io(&target, e)
            }
        })
    }

    /// Copy the file and its manifest into `staging`.
    fn stage_version(
        &self,
        staging: &Path,
        source: &Path,
        file: &str,
        metadata: &ArtifactMetadata,
        version: u32,
        digest: &str,
    ) -> Result<(), RegistryError> {
        let dest = staging.join(file);
        fs::copy(source, &dest).map_err(|e| RegistryError::io(&dest, e))?;

        let manifest = Manifest {
            metadata: metadata.clone(),
            version,
            file: file.to_string(),
            digest: digest.to_string(),
            created_at: Utc::now(),
            run_id: self.run.id.clone(),
        };
        let manifest_path = staging.join(MANIFEST_FILE);
        let body = serde_json::to_string_pretty(&manifest)?;
        fs::write(&manifest_path, body).map_err(|e| RegistryError::io(&manifest_path, e))
    }
}

impl ArtifactRegistry for LocalRegistry {
    fn record_config(&mut self, config: &serde_json::Value) -> Result<(), RegistryError> {
        if let serde_json::Value::Object(map) = config {
            for (key, value) in map {
                self.run.config.insert(key.clone(), value.clone());
            }
        }
        self.save_run()
    }

    fn fetch(&mut self, reference: &ArtifactRef) -> Result<PathBuf, RegistryError> {
        let version = self.resolve(reference)?;
        let manifest = self.manifest(&reference.name, version)?;
        let path = self.version_dir(&reference.name, version).join(&manifest.file);

        let actual = file_digest(&path)?;
        if actual != manifest.digest {
            return Err(RegistryError::DigestMismatch {
                reference: format!("{}:v{version}", reference.name),
                expected: manifest.digest,
                actual,
            });
        }

        self.run.used.push(format!("{}:v{version}", reference.name));
        self.save_run()?;
        debug!("Resolved {reference} to {}", path.display());
        Ok(path)
    }

    fn publish(
        &mut self,
        path: &Path,
        metadata: &ArtifactMetadata,
    ) -> Result<PublishedArtifact, RegistryError> {
        if !is_valid_name(&metadata.name) {
            return Err(RegistryError::InvalidName(metadata.name.clone()));
        }
        let file = path
            .file_name()
            .and_then(|f| f.to_str())
            .map(str::to_string)
            .filter(|f| f != MANIFEST_FILE)
            .ok_or_else(|| RegistryError::InvalidName(path.display().to_string()))?;
        let digest = file_digest(path)?;

        let latest = self.latest_version(&metadata.name)?;
        if let Some(v) = latest {
            let existing = self.manifest(&metadata.name, v)?;
            if existing.digest == digest && existing.metadata == *metadata {
                info!(
                    "{}:v{v} already holds identical content and metadata, not creating a new version",
                    metadata.name
                );
                let published = PublishedArtifact {
                    name: metadata.name.clone(),
                    version: v,
                    digest,
                };
                self.run.logged.push(published.to_string());
                self.save_run()?;
                return Ok(published);
            }
        }
        let version = latest.map_or(0, |v| v + 1);

        let artifact_dir = self.artifact_dir(&metadata.name);
        let staging = artifact_dir.join(format!(".staging-{}", self.run.id));
        fs::create_dir_all(&staging).map_err(|e| RegistryError::io(&staging, e))?;

        let staged = self
            .stage_version(&staging, path, &file, metadata, version, &digest)
            .and_then(|()| self.commit(&staging, &metadata.name, version));
        if let Err(err) = staged {
            // Nothing under v<N> was created; drop the partial staging copy.
            let _ = fs::remove_dir_all(&staging);
            return Err(err);
        }

        let published = PublishedArtifact {
            name: metadata.name.clone(),
            version,
            digest,
        };
        self.run.logged.push(published.to_string());
        self.save_run()?;
        info!("Published {published} ({})", metadata.artifact_type);
        Ok(published)
    }
}

/// Hex-encoded sha256 of a file's contents.
pub fn file_digest(path: &Path) -> Result<String, RegistryError> {
    let bytes = fs::read(path).map_err(|e| RegistryError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
