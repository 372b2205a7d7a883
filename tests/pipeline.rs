use std::fs;
use std::path::{Path, PathBuf};

use basic_cleaning::data::model::Value;
use basic_cleaning::data::{load_csv, GeoBoundingBox};
use basic_cleaning::{
    ArtifactMetadata, ArtifactRef, ArtifactRegistry, CleaningError, LocalRegistry, Orchestrator,
    PipelineConfig, PublishedArtifact, RegistryError, Stage, JOB_TYPE,
};

const RAW: &str = "\
id,name,price,longitude,latitude,last_review,number_of_reviews
1,Cozy loft,120,-73.9,40.7,2019-05-01,4
2,Penthouse,50000,-73.9,40.7,2019-05-01,1
3,\"Far, far away\",150,-72.1,40.7,2018-01-02,2
4,No reviews yet,85,-73.95,40.68,,0
5,Shared room,49,-73.9,40.7,2019-06-01,3
";

const CLEAN: &str = "\
id,name,price,longitude,latitude,last_review,number_of_reviews
1,Cozy loft,120,-73.9,40.7,2019-05-01,4
4,No reviews yet,85,-73.95,40.68,,0
";

struct Workspace {
    registry_root: tempfile::TempDir,
    work: tempfile::TempDir,
    scratch: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Workspace {
            registry_root: tempfile::tempdir().unwrap(),
            work: tempfile::tempdir().unwrap(),
            scratch: tempfile::tempdir().unwrap(),
        }
    }

    /// Publish `body` as `sample.csv` the way the upstream download step would.
    fn seed_raw(&self, body: &str) {
        let path = self.scratch.path().join("sample.csv");
        fs::write(&path, body).unwrap();
        let mut registry = LocalRegistry::init(self.registry_root.path(), "download").unwrap();
        registry
            .publish(
                &path,
                &ArtifactMetadata {
                    name: "sample.csv".into(),
                    artifact_type: "raw_data".into(),
                    description: "Raw listings".into(),
                },
            )
            .unwrap();
    }

    fn registry(&self) -> LocalRegistry {
        LocalRegistry::init(self.registry_root.path(), JOB_TYPE).unwrap()
    }

    fn fetch_clean(&self) -> String {
        let path = self
            .registry()
            .fetch(&ArtifactRef::parse("clean_sample.csv:latest").unwrap())
            .unwrap();
        fs::read_to_string(path).unwrap()
    }

    fn work_dir_entries(&self) -> usize {
        fs::read_dir(self.work.path()).unwrap().count()
    }
}

fn config(min_price: f64, max_price: f64) -> PipelineConfig {
    PipelineConfig::new(
        ArtifactRef::parse("sample.csv:latest").unwrap(),
        "clean_sample.csv",
        "clean_sample",
        "Data with outliers and null values removed",
        min_price,
        max_price,
    )
    .unwrap()
}

#[test]
fn cleans_and_publishes() {
    let ws = Workspace::new();
    ws.seed_raw(RAW);

    let mut orchestrator = Orchestrator::new(config(50.0, 1000.0), ws.registry(), ws.work.path());
    let summary = orchestrator.run().unwrap();

    assert_eq!(orchestrator.state(), Stage::Done);
    assert_eq!(summary.rows_loaded, 5);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.published.name, "clean_sample.csv");
    assert_eq!(summary.published.version, 0);
    assert_eq!(ws.fetch_clean(), CLEAN);

    let run = orchestrator.registry().run();
    assert_eq!(run.used, ["sample.csv:v0"]);
    assert_eq!(run.logged, ["clean_sample.csv:v0"]);
    assert_eq!(run.config["input_artifact"], "sample.csv:latest");
    assert_eq!(run.config["min_price"], 50.0);
}

#[test]
fn temporary_output_is_gone_after_success() {
    let ws = Workspace::new();
    ws.seed_raw(RAW);

    Orchestrator::new(config(50.0, 1000.0), ws.registry(), ws.work.path())
        .run()
        .unwrap();
    assert_eq!(ws.work_dir_entries(), 0);
}

#[test]
fn output_rows_satisfy_every_predicate() {
    let ws = Workspace::new();
    ws.seed_raw(RAW);
    Orchestrator::new(config(50.0, 1000.0), ws.registry(), ws.work.path())
        .run()
        .unwrap();

    let out = ws.scratch.path().join("clean.csv");
    fs::write(&out, ws.fetch_clean()).unwrap();
    let ds = load_csv(&out).unwrap();

    let price = ds.column_index("price").unwrap();
    let lon = ds.column_index("longitude").unwrap();
    let lat = ds.column_index("latitude").unwrap();
    let review = ds.column_index("last_review").unwrap();
    for row in &ds.rows {
        let p = row.get(price).as_f64().unwrap();
        assert!((50.0..=1000.0).contains(&p));
        assert!(GeoBoundingBox::NYC.contains(
            row.get(lon).as_f64().unwrap(),
            row.get(lat).as_f64().unwrap()
        ));
        match row.get(review) {
            Value::Null => {}
            Value::String(s) => {
                assert!(basic_cleaning::data::datetime::parse_datetime(s).is_some(), "{s}")
            }
            other => panic!("unexpected last_review {other:?}"),
        }
    }
}

#[test]
fn repeated_runs_are_byte_identical() {
    let ws = Workspace::new();
    ws.seed_raw(RAW);

    let first = Orchestrator::new(config(50.0, 1000.0), ws.registry(), ws.work.path())
        .run()
        .unwrap();
    let first_bytes = ws.fetch_clean();

    let second = Orchestrator::new(config(50.0, 1000.0), ws.registry(), ws.work.path())
        .run()
        .unwrap();
    let second_bytes = ws.fetch_clean();

    assert_eq!(first_bytes, second_bytes);
    assert_eq!(first.published, second.published);
}

#[test]
fn untouched_columns_are_written_verbatim() {
    let ws = Workspace::new();
    ws.seed_raw(
        "id,name,host_name,price,longitude,latitude,last_review,reviews_per_month\n\
         12345678901234567890,007,+44,120,-73.90,40.70,2019-05-01,1.50\n\
         2,Loft,Ann,085,-73.9,40.7,,\n",
    );

    Orchestrator::new(config(50.0, 1000.0), ws.registry(), ws.work.path())
        .run()
        .unwrap();
    assert_eq!(
        ws.fetch_clean(),
        "id,name,host_name,price,longitude,latitude,last_review,reviews_per_month\n\
         12345678901234567890,007,+44,120,-73.90,40.70,2019-05-01,1.50\n\
         2,Loft,Ann,085,-73.9,40.7,,\n"
    );
}

#[test]
fn header_only_input_gives_header_only_output() {
    let ws = Workspace::new();
    ws.seed_raw("id,price,longitude,latitude,last_review\n");

    let summary = Orchestrator::new(config(10.0, 350.0), ws.registry(), ws.work.path())
        .run()
        .unwrap();
    assert_eq!(summary.rows_written, 0);
    assert_eq!(ws.fetch_clean(), "id,price,longitude,latitude,last_review\n");
}

#[test]
fn unparseable_review_date_fails_without_publishing() {
    let ws = Workspace::new();
    ws.seed_raw(
        "price,longitude,latitude,last_review\n\
         120,-73.9,40.7,not-a-date\n",
    );

    let mut orchestrator = Orchestrator::new(config(50.0, 1000.0), ws.registry(), ws.work.path());
    let err = orchestrator.run().unwrap_err();

    assert_eq!(err.stage, Stage::DatetimeNormalized);
    assert_eq!(orchestrator.state(), Stage::Failed);
    match &err.source {
        CleaningError::Parse { row, column, detail } => {
            assert_eq!(*row, 0);
            assert_eq!(column.as_deref(), Some("last_review"));
            assert!(detail.contains("not-a-date"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(orchestrator.registry().run().logged.is_empty());
    assert_eq!(ws.registry().latest_version("clean_sample.csv").unwrap(), None);
    assert_eq!(ws.work_dir_entries(), 0);
}

#[test]
fn missing_input_artifact_fails_at_fetch() {
    let ws = Workspace::new();

    let mut orchestrator = Orchestrator::new(config(50.0, 1000.0), ws.registry(), ws.work.path());
    let err = orchestrator.run().unwrap_err();

    assert_eq!(err.stage, Stage::Fetching);
    assert!(matches!(
        err.source,
        CleaningError::Registry(RegistryError::NotFound(_))
    ));
}

#[test]
fn missing_required_column_fails_at_load() {
    let ws = Workspace::new();
    ws.seed_raw("price,longitude,latitude\n120,-73.9,40.7\n");

    let err = Orchestrator::new(config(50.0, 1000.0), ws.registry(), ws.work.path())
        .run()
        .unwrap_err();
    assert_eq!(err.stage, Stage::Loaded);
    assert!(matches!(err.source, CleaningError::Schema(_)));
}

#[test]
fn orchestrator_runs_only_once() {
    let ws = Workspace::new();
    ws.seed_raw(RAW);

    let mut orchestrator = Orchestrator::new(config(50.0, 1000.0), ws.registry(), ws.work.path());
    orchestrator.run().unwrap();
    assert!(orchestrator.run().is_err());
}

// ---------------------------------------------------------------------------
// Scripted registry for failure paths
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ScriptedRegistry {
    input: Option<PathBuf>,
    fail_publish: bool,
    /// Remove the staged output's directory while publishing.
    take_staged_dir: bool,
    configs: usize,
    fetches: usize,
    publishes: usize,
    published_paths: Vec<PathBuf>,
}

impl ArtifactRegistry for ScriptedRegistry {
    fn record_config(&mut self, _config: &serde_json::Value) -> Result<(), RegistryError> {
        self.configs += 1;
        Ok(())
    }

    fn fetch(&mut self, reference: &ArtifactRef) -> Result<PathBuf, RegistryError> {
        self.fetches += 1;
        self.input
            .clone()
            .ok_or_else(|| RegistryError::NotFound(reference.name.clone()))
    }

    fn publish(
        &mut self,
        path: &Path,
        metadata: &ArtifactMetadata,
    ) -> Result<PublishedArtifact, RegistryError> {
        self.publishes += 1;
        self.published_paths.push(path.to_path_buf());
        if self.take_staged_dir {
            if let Some(dir) = path.parent() {
                fs::remove_dir_all(dir).map_err(|e| RegistryError::Io {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
            }
        }
        if self.fail_publish {
            return Err(RegistryError::Conflict {
                name: metadata.name.clone(),
                version: 0,
            });
        }
        Ok(PublishedArtifact {
            name: metadata.name.clone(),
            version: 0,
            digest: "feed".into(),
        })
    }
}

#[test]
fn fetch_failure_never_reaches_publish() {
    let work = tempfile::tempdir().unwrap();
    let mut registry = ScriptedRegistry::default();

    let err = Orchestrator::new(config(50.0, 1000.0), &mut registry, work.path())
        .run()
        .unwrap_err();

    assert_eq!(err.stage, Stage::Fetching);
    assert_eq!(registry.configs, 1);
    assert_eq!(registry.fetches, 1);
    assert_eq!(registry.publishes, 0);
}

#[test]
fn publish_failure_still_removes_temporary_output() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("raw.csv");
    fs::write(&input, RAW).unwrap();
    let mut registry = ScriptedRegistry {
        input: Some(input),
        fail_publish: true,
        ..Default::default()
    };

    let err = Orchestrator::new(config(50.0, 1000.0), &mut registry, work.path())
        .run()
        .unwrap_err();

    assert_eq!(err.stage, Stage::Published);
    assert!(matches!(
        err.source,
        CleaningError::Registry(RegistryError::Conflict { .. })
    ));
    assert_eq!(registry.publishes, 1);
    let staged = &registry.published_paths[0];
    assert_eq!(staged.file_name().unwrap(), "clean_sample.csv");
    assert!(!staged.exists());
    // Only the raw input is left behind.
    assert_eq!(fs::read_dir(work.path()).unwrap().count(), 1);
}

#[test]
fn published_file_carries_the_output_name() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("raw.csv");
    fs::write(&input, RAW).unwrap();
    let mut registry = ScriptedRegistry {
        input: Some(input),
        ..Default::default()
    };

    let summary = Orchestrator::new(config(50.0, 1000.0), &mut registry, work.path())
        .run()
        .unwrap();
    assert_eq!(summary.published.to_string(), "clean_sample.csv:v0");
    assert!(!registry.published_paths[0].exists());
}

#[test]
fn cleanup_failure_after_publish_fails_at_cleanup() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("raw.csv");
    fs::write(&input, RAW).unwrap();
    let mut registry = ScriptedRegistry {
        input: Some(input),
        take_staged_dir: true,
        ..Default::default()
    };

    let mut orchestrator = Orchestrator::new(config(50.0, 1000.0), &mut registry, work.path());
    let err = orchestrator.run().unwrap_err();
    assert_eq!(orchestrator.state(), Stage::Failed);
    drop(orchestrator);

    assert_eq!(err.stage, Stage::CleanedUp);
    assert!(matches!(err.source, CleaningError::Io { .. }));
    assert_eq!(registry.publishes, 1);
}
