//! `taxoflow export` - write one collection of a model as JSON lines

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use taxoflow_core::CancelToken;
use taxoflow_model::Collection;
use taxoflow_pipeline::{JsonlSink, export_records, track_job};
use taxoflow_store::JobKind;

use super::{Env, block_on, job_id, parse_collection, report};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Source model
    #[arg(short, long)]
    pub model: String,

    /// Collection to export
    #[arg(short, long, value_parser = parse_collection)]
    pub kind: Collection,

    /// Output file (written atomically)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Job id (default: export-<timestamp>)
    #[arg(long)]
    pub job_id: Option<String>,
}

pub fn run(args: ExportArgs, env: &Env) -> Result<()> {
    let repo = env.load_repository()?;
    let jobs = env.job_store();
    let job_id = job_id(JobKind::Export, args.job_id);
    let mut sink = JsonlSink::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let run = export_records(
        &repo,
        args.kind,
        &args.model,
        &mut sink,
        &env.config.pipeline,
        CancelToken::process(),
        env.progress,
    );
    let outcome = block_on(track_job(&jobs, &job_id, JobKind::Export, run))?;

    if outcome.is_ok() {
        let written = sink
            .finish()
            .with_context(|| format!("failed to finalize {}", args.output.display()))?;
        log::info!("Wrote {written} records to {}", args.output.display());
    } else {
        log::warn!(
            "Discarding {} partial records for {}",
            sink.written(),
            args.output.display()
        );
        sink.abort()
            .with_context(|| format!("failed to clean up {}", args.output.display()))?;
    }
    report(&job_id, outcome)
}
