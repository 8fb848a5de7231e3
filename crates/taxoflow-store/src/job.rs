//! Job state records and the stores that keep them

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use taxoflow_core::{PipelineError, RowsProcessedStats};

use crate::atomic::write_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// Which pipeline a job ran; also prefixes the error/warning flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Import,
    Export,
    Centrality,
}

impl JobKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Export => "export",
            Self::Centrality => "centrality",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        [Self::Import, Self::Export, Self::Centrality]
            .into_iter()
            .find(|k| k.name() == s)
    }

    fn errors_field(self) -> &'static str {
        match self {
            Self::Import => "importErrors",
            Self::Export => "exportErrors",
            Self::Centrality => "centralityErrors",
        }
    }

    fn warnings_field(self) -> &'static str {
        match self {
            Self::Import => "importWarnings",
            Self::Export => "exportWarnings",
            Self::Centrality => "centralityWarnings",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome attached to a finished job.
///
/// Serialized as `{"kind": "import", "errored": .., "importErrors": ..,
/// "importWarnings": .., "stats": {..}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub kind: JobKind,
    /// The run itself failed
    pub errored: bool,
    /// At least one row failed
    pub errors: bool,
    pub warnings: bool,
    pub stats: Option<RowsProcessedStats>,
    pub message: Option<String>,
}

impl JobResult {
    /// Result of a run that reached its end; row failures only raise `errors`.
    pub fn completed(kind: JobKind, stats: RowsProcessedStats) -> Self {
        Self {
            kind,
            errored: false,
            errors: stats.rows_failed > 0,
            warnings: false,
            stats: Some(stats),
            message: None,
        }
    }

    /// Result of a run that stopped on a fatal error, keeping partial stats.
    pub fn failed(kind: JobKind, partial: RowsProcessedStats, message: impl Into<String>) -> Self {
        Self {
            kind,
            errored: true,
            errors: true,
            warnings: false,
            stats: Some(partial),
            message: Some(message.into()),
        }
    }
}

impl Serialize for JobResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", &self.kind)?;
        map.serialize_entry("errored", &self.errored)?;
        map.serialize_entry(self.kind.errors_field(), &self.errors)?;
        map.serialize_entry(self.kind.warnings_field(), &self.warnings)?;
        if let Some(stats) = &self.stats {
            map.serialize_entry("stats", stats)?;
        }
        if let Some(message) = &self.message {
            map.serialize_entry("message", message)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for JobResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut take = |key: &str| map.remove(key).unwrap_or(serde_json::Value::Null);

        let kind: JobKind = serde_json::from_value(take("kind")).map_err(D::Error::custom)?;
        let flag = |v: serde_json::Value| v.as_bool().unwrap_or(false);
        Ok(Self {
            kind,
            errored: flag(take("errored")),
            errors: flag(take(kind.errors_field())),
            warnings: flag(take(kind.warnings_field())),
            stats: serde_json::from_value(take("stats")).map_err(D::Error::custom)?,
            message: serde_json::from_value(take("message")).map_err(D::Error::custom)?,
        })
    }
}

/// One state transition reported to a [`JobStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub result: Option<JobResult>,
}

impl JobUpdate {
    pub fn running() -> Self {
        Self {
            status: JobStatus::Running,
            result: None,
        }
    }

    pub fn finished(result: JobResult) -> Self {
        let status = if result.errored {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        Self {
            status,
            result: Some(result),
        }
    }
}

/// Latest known state of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    fn apply(previous: Option<JobRecord>, job_id: &str, update: JobUpdate) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.to_string(),
            status: update.status,
            result: update.result,
            created_at: previous.map_or(now, |p| p.created_at),
            updated_at: now,
        }
    }
}

pub trait JobStore {
    fn update(
        &self,
        job_id: &str,
        update: JobUpdate,
    ) -> impl Future<Output = Result<(), PipelineError>>;
}

impl<J: JobStore> JobStore for &J {
    fn update(
        &self,
        job_id: &str,
        update: JobUpdate,
    ) -> impl Future<Output = Result<(), PipelineError>> {
        (**self).update(job_id, update)
    }
}

/// Job store kept in memory, with the full update history.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<BTreeMap<String, JobRecord>>,
    history: Mutex<Vec<(String, JobUpdate)>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.get(job_id).cloned()
    }

    /// Every update received so far, oldest first.
    pub fn history(&self) -> Vec<(String, JobUpdate)> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl JobStore for MemoryJobStore {
    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<(), PipelineError> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((job_id.to_string(), update.clone()));
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = jobs.remove(job_id);
        jobs.insert(job_id.to_string(), JobRecord::apply(previous, job_id, update));
        Ok(())
    }
}

/// Job store writing one `<job_id>.json` per job into a directory.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    dir: PathBuf,
}

impl FileJobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{job_id}.json"))
    }

    /// Read one job record.
    pub fn read(&self, job_id: &str) -> Result<JobRecord> {
        let path = self.path(job_id);
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// All job records, oldest first. A missing directory means no jobs;
    /// unreadable records are skipped with a warning.
    pub fn list(&self) -> Result<Vec<JobRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list {}", self.dir.display()))?;

        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let Some(job_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read(job_id) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping job record: {e:#}"),
            }
        }
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        Ok(records)
    }
}

fn validate_job_id(job_id: &str) -> Result<(), PipelineError> {
    let valid = !job_id.is_empty()
        && !job_id.starts_with('.')
        && !job_id.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(PipelineError::repository(
            "job update",
            format!("invalid job id {job_id:?}"),
        ))
    }
}

impl JobStore for FileJobStore {
    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<(), PipelineError> {
        validate_job_id(job_id)?;
        let previous = if self.path(job_id).exists() {
            let record = self
                .read(job_id)
                .map_err(|e| PipelineError::repository("job update", format!("{e:#}")))?;
            Some(record)
        } else {
            None
        };
        let record = JobRecord::apply(previous, job_id, update);
        let json = serde_json::to_vec_pretty(&record)?;
        write_atomic(&self.path(job_id), &json)?;
        log::debug!("Job {job_id} is {}", record.status);
        Ok(())
    }
}
