//! taxoflow-pipeline: the taxonomy jobs
//!
//! Each orchestrator wires a source stream through the core stages into a
//! [`BatchProcessor`](taxoflow_core::BatchProcessor):
//!
//! - [`import_rows`]: rows → records → repository inserts
//! - [`export_records`]: documents → records → sink writes
//! - [`compute_degree_centrality`]: relation counts → skill updates
//!
//! [`track_job`] records a run's lifecycle in a job store.

pub mod centrality;
pub mod config;
pub mod export;
pub mod import;
pub mod job;
pub mod report;
pub mod sink;
pub mod source;
mod ticker;

pub use centrality::compute_degree_centrality;
pub use config::PipelineConfig;
pub use export::export_records;
pub use import::import_rows;
pub use job::track_job;
pub use report::{RunFailure, RunSummary};
pub use sink::{JsonlSink, RecordSink};
pub use source::{JsonlRows, SourceRow, open_rows, rows_from_iter};
