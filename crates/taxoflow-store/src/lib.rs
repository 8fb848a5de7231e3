//! taxoflow-store: persistence behind the taxonomy pipelines
//!
//! Defines the [`Repository`] and [`JobStore`] contracts the orchestrators
//! are written against, plus an in-memory repository that snapshots to a
//! JSON file and a job store keeping one JSON file per job.

pub mod atomic;
pub mod job;
pub mod memory;
pub mod repository;

pub use atomic::{tmp_path, write_atomic};
pub use job::{
    FileJobStore, JobKind, JobRecord, JobResult, JobStatus, JobStore, JobUpdate, MemoryJobStore,
};
pub use memory::{MemoryRepository, StoredDocument};
pub use repository::{DEGREE_CENTRALITY_FIELD, Repository, SkillConnection, WriteReport};
