//! Subcommands and the plumbing they share

pub mod centrality;
pub mod export;
pub mod import;
pub mod jobs;

use std::future::Future;

use anyhow::{Context, Result};
use taxoflow_core::SharedProgress;
use taxoflow_model::Collection;
use taxoflow_pipeline::{RunFailure, RunSummary};
use taxoflow_store::{FileJobStore, JobKind, MemoryRepository};

use crate::config::Config;

/// What every run command needs.
pub struct Env<'a> {
    pub config: &'a Config,
    pub progress: &'a SharedProgress,
}

impl Env<'_> {
    pub fn load_repository(&self) -> Result<MemoryRepository> {
        MemoryRepository::load(&self.config.store.repository_path())
    }

    pub fn save_repository(&self, repo: &MemoryRepository) -> Result<()> {
        let path = self.config.store.repository_path();
        repo.save(&path)?;
        log::debug!("Saved repository to {}", path.display());
        Ok(())
    }

    pub fn job_store(&self) -> FileJobStore {
        FileJobStore::new(self.config.store.jobs_dir())
    }
}

/// `<kind>-<UTC timestamp>` unless the caller picked one.
pub fn job_id(kind: JobKind, explicit: Option<String>) -> String {
    explicit.unwrap_or_else(|| {
        format!("{kind}-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S%3f"))
    })
}

/// clap value parser for collection names
pub fn parse_collection(s: &str) -> Result<Collection, String> {
    Collection::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = Collection::ALL.iter().map(|c| c.name()).collect();
        format!("unknown collection '{s}', expected one of: {}", names.join(", "))
    })
}

/// Drive a pipeline future to completion on a current-thread runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    Ok(runtime.block_on(future))
}

/// Log and print a finished run, or turn its failure into an error.
pub fn report(job_id: &str, outcome: Result<RunSummary, RunFailure>) -> Result<()> {
    match outcome {
        Ok(summary) => {
            summary.log();
            eprintln!("\n{}", summary.to_table());
            Ok(())
        }
        Err(failure) => Err(anyhow::Error::new(failure).context(format!("job {job_id} failed"))),
    }
}
