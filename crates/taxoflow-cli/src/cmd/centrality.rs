//! `taxoflow centrality` - store degree centrality on a model's skills

use anyhow::Result;
use clap::Args;
use taxoflow_core::CancelToken;
use taxoflow_pipeline::{compute_degree_centrality, track_job};
use taxoflow_store::JobKind;

use super::{Env, block_on, job_id, report};

#[derive(Args, Debug)]
pub struct CentralityArgs {
    /// Model to update
    #[arg(short, long)]
    pub model: String,

    /// Job id (default: centrality-<timestamp>)
    #[arg(long)]
    pub job_id: Option<String>,
}

pub fn run(args: CentralityArgs, env: &Env) -> Result<()> {
    let repo = env.load_repository()?;
    let jobs = env.job_store();
    let job_id = job_id(JobKind::Centrality, args.job_id);

    let run = compute_degree_centrality(
        &repo,
        &args.model,
        &env.config.pipeline,
        CancelToken::process(),
        env.progress,
    );
    let outcome = block_on(track_job(&jobs, &job_id, JobKind::Centrality, run))?;

    env.save_repository(&repo)?;
    report(&job_id, outcome)
}
