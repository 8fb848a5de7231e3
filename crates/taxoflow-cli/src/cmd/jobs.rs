//! `taxoflow jobs` - inspect recorded job states

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use taxoflow_core::fmt_num;
use taxoflow_store::{FileJobStore, JobRecord, JobStatus};

#[derive(Args, Debug)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub action: JobsAction,
}

#[derive(Subcommand, Debug)]
pub enum JobsAction {
    /// List all jobs, oldest first
    List,
    /// Print one job record as JSON
    Show {
        /// Job id
        id: String,
    },
}

pub fn run(args: JobsArgs, jobs_dir: &Path) -> Result<()> {
    let store = FileJobStore::new(jobs_dir);
    match args.action {
        JobsAction::List => list(&store),
        JobsAction::Show { id } => show(&store, &id),
    }
}

fn status_cell(status: JobStatus) -> Cell {
    let color = match status {
        JobStatus::Running => Color::Yellow,
        JobStatus::Completed => Color::Green,
        JobStatus::Failed => Color::Red,
    };
    Cell::new(status.to_string()).fg(color)
}

fn row_counts(record: &JobRecord) -> [String; 3] {
    match record.result.as_ref().and_then(|r| r.stats) {
        Some(s) => [
            fmt_num(s.rows_processed),
            fmt_num(s.rows_success),
            fmt_num(s.rows_failed),
        ],
        None => ["-".into(), "-".into(), "-".into()],
    }
}

fn list(store: &FileJobStore) -> Result<()> {
    let records = store.list()?;
    if records.is_empty() {
        eprintln!("No jobs in {}", store.dir().display());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            ["Job", "Status", "Processed", "Ok", "Failed", "Updated"]
                .map(|h| Cell::new(h).fg(Color::Cyan)),
        );

    for record in &records {
        let [processed, ok, failed] = row_counts(record);
        table.add_row(vec![
            Cell::new(&record.job_id),
            status_cell(record.status),
            Cell::new(processed),
            Cell::new(ok),
            Cell::new(failed),
            Cell::new(record.updated_at.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }

    eprintln!("\n{table}");
    Ok(())
}

fn show(store: &FileJobStore, id: &str) -> Result<()> {
    let record = store.read(id)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
