//! Run tracking.
//!
//! A [`RunContext`] is an explicit record of one job: its configuration, the
//! artifacts it consumed and produced, and the cleaning summary. It is passed
//! around by the job code instead of living in a global, and persisted by
//! [`RunStore`] once the job ends.

use crate::error::{CleaningError, Result, ResultExt as _};
use crate::pipeline::CleaningReport;
use crate::store::{ArtifactId, ArtifactStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Lifecycle state of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "message")]
pub enum RunStatus {
    Running,
    Finished,
    Failed(String),
}

/// An artifact version seen by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: ArtifactId,
    pub digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    pub id: Uuid,
    pub job_type: String,
    pub config: serde_json::Value,
    pub status: RunStatus,
    pub used_artifacts: Vec<ArtifactRecord>,
    pub logged_artifacts: Vec<ArtifactRecord>,
    pub summary: Option<CleaningReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunContext {
    /// # Errors
    ///
    /// Returns an error if `config` cannot be serialized to JSON.
    pub fn new(job_type: impl Into<String>, config: &impl Serialize) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            job_type: job_type.into(),
            config: serde_json::to_value(config)?,
            status: RunStatus::Running,
            used_artifacts: Vec::new(),
            logged_artifacts: Vec::new(),
            summary: None,
            started_at: Utc::now(),
            finished_at: None,
        })
    }

    /// Fetch an input artifact and record it as consumed by this run.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub fn use_artifact(&mut self, store: &dyn ArtifactStore, identifier: &str) -> Result<PathBuf> {
        let manifest = store.manifest(identifier)?;
        let path = store.fetch(&manifest.id().to_string())?;
        self.used_artifacts.push(ArtifactRecord {
            id: manifest.id(),
            digest: manifest.digest,
        });
        Ok(path)
    }

    /// Publish an output artifact and record it as produced by this run.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub fn log_artifact(
        &mut self,
        store: &dyn ArtifactStore,
        name: &str,
        artifact_type: &str,
        description: &str,
        local_path: &Path,
    ) -> Result<ArtifactId> {
        let id = store.publish(name, artifact_type, description, local_path)?;
        let manifest = store.manifest(&id.to_string())?;
        self.logged_artifacts.push(ArtifactRecord {
            id: id.clone(),
            digest: manifest.digest,
        });
        Ok(id)
    }

    pub fn finish(&mut self, summary: CleaningReport) {
        self.summary = Some(summary);
        self.status = RunStatus::Finished;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: &CleaningError) {
        self.status = RunStatus::Failed(error.to_string());
        self.finished_at = Some(Utc::now());
    }
}

/// Persists run records as `<root>/runs/<id>.json`.
#[derive(Debug, Clone)]
pub struct RunStore {
    runs_dir: PathBuf,
}

impl RunStore {
    /// # Errors
    ///
    /// Returns an error if the runs directory cannot be created.
    pub fn new(base_path: &Path) -> Result<Self> {
        let runs_dir = base_path.join("runs");
        fs::create_dir_all(&runs_dir).context("Failed to create runs directory")?;
        Ok(Self { runs_dir })
    }

    fn run_path(&self, id: &Uuid) -> PathBuf {
        self.runs_dir.join(format!("{id}.json"))
    }

    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub fn save(&self, run: &RunContext) -> Result<()> {
        let json = serde_json::to_string_pretty(run)?;
        fs::write(self.run_path(&run.id), json).context("Failed to write run record")?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the record is missing or malformed.
    pub fn load(&self, id: &Uuid) -> Result<RunContext> {
        let json = fs::read_to_string(self.run_path(id))
            .with_context(|| format!("Failed to read run record {id}"))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// All recorded runs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the runs directory or a record cannot be read.
    pub fn list(&self) -> Result<Vec<RunContext>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.runs_dir).context("Failed to read runs directory")? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                let json = fs::read_to_string(&path)?;
                runs.push(serde_json::from_str::<RunContext>(&json)?);
            }
        }
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }
}
