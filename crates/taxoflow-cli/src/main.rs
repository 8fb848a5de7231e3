//! taxoflow - batch import, export and analysis of occupation/skill taxonomies
//!
//! Moves taxonomy models between JSON-lines files and a local repository
//! snapshot, recording every run as a job under the data directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use taxoflow_core::{CancelToken, ProgressContext, Verbosity, init_logging};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "taxoflow")]
#[command(about = "Batch pipelines for occupation and skill taxonomies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./taxoflow.toml or ~/.config/taxoflow/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the repository snapshot and job records
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Records per batch
    #[arg(long, global = true)]
    batch_size: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Import a JSON-lines file into a model
    Import(cmd::import::ImportArgs),
    /// Export a model's collection as JSON lines
    Export(cmd::export::ExportArgs),
    /// Compute degree centrality for a model's skills
    Centrality(cmd::centrality::CentralityArgs),
    /// Inspect recorded jobs
    Jobs(cmd::jobs::JobsArgs),
    /// Show current configuration
    Config,
}

fn setup_signal_handler() -> Result<()> {
    let token = CancelToken::process();
    // First signal: cancel the running job
    // Second signal: force exit
    // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        unsafe {
            signal_hook::low_level::register(signal, move || {
                if token.cancel_again() {
                    std::process::exit(130);
                }
            })?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = Arc::new(ProgressContext::new());

    // Logging:
    //   TTY:     warn unless --debug, the job lines show activity
    //   non-TTY: info unless --debug
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    init_logging(Verbosity::from_flags(is_tty, cli.debug), multi);

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    }
    .with_overrides(cli.data_dir, cli.batch_size);

    setup_signal_handler()?;

    let env = cmd::Env {
        config: &config,
        progress: &progress,
    };
    match cli.command {
        Command::Import(args) => cmd::import::run(args, &env),
        Command::Export(args) => cmd::export::run(args, &env),
        Command::Centrality(args) => cmd::centrality::run(args, &env),
        Command::Jobs(args) => cmd::jobs::run(args, &config.store.jobs_dir()),
        Command::Config => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Data directory",
                &config.store.data_dir.display().to_string(),
            ]);
            table.add_row(vec![
                "Repository",
                &config.store.repository_path().display().to_string(),
            ]);
            table.add_row(vec![
                "Jobs",
                &config.store.jobs_dir().display().to_string(),
            ]);
            table.add_row(vec!["Batch size", &config.pipeline.batch_size.to_string()]);
            table.add_row(vec![
                "Centrality batch size",
                &config.pipeline.centrality_batch_size.to_string(),
            ]);
            table.add_row(vec![
                "Progress interval",
                &config.pipeline.progress_interval.to_string(),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
