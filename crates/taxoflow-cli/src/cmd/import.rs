//! `taxoflow import` - load a JSON-lines file into a model

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use taxoflow_core::CancelToken;
use taxoflow_model::Collection;
use taxoflow_pipeline::{import_rows, open_rows, track_job};
use taxoflow_store::JobKind;

use super::{Env, block_on, job_id, parse_collection, report};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Target model
    #[arg(short, long)]
    pub model: String,

    /// Collection the rows belong to (e.g. skills, occupations, hierarchy)
    #[arg(short, long, value_parser = parse_collection)]
    pub kind: Collection,

    /// Job id (default: import-<timestamp>)
    #[arg(long)]
    pub job_id: Option<String>,

    /// JSON-lines file, one row object per line
    pub file: PathBuf,
}

pub fn run(args: ImportArgs, env: &Env) -> Result<()> {
    let repo = env.load_repository()?;
    let jobs = env.job_store();
    let job_id = job_id(JobKind::Import, args.job_id);
    let rows = open_rows(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;

    log::info!("Importing {} into {} ({})", args.file.display(), args.model, args.kind);

    let run = import_rows(
        rows.into_stream(),
        args.kind,
        &repo,
        &args.model,
        &env.config.pipeline,
        CancelToken::process(),
        env.progress,
    );
    let outcome = block_on(track_job(&jobs, &job_id, JobKind::Import, run))?;

    // Batches inserted before a failure are kept.
    env.save_repository(&repo)?;
    report(&job_id, outcome)
}
