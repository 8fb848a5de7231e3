//! Periodic progress reporting shared by the orchestrators

use indicatif::ProgressBar;
use taxoflow_core::{ProgressContext, RowsProcessedStats, fmt_num, show_stats};

/// Refreshes a job line every `interval` objects; logs instead outside a TTY.
pub(crate) struct Ticker {
    pb: ProgressBar,
    label: String,
    interval: u64,
    tty: bool,
}

impl Ticker {
    pub(crate) fn new(progress: &ProgressContext, label: String, interval: u64) -> Self {
        Self {
            pb: progress.job_line(&label),
            label,
            interval: interval.max(1),
            tty: progress.is_tty(),
        }
    }

    pub(crate) fn tick(&self, objects: u64, stats: &RowsProcessedStats) {
        if objects == 0 || !objects.is_multiple_of(self.interval) {
            return;
        }
        if self.tty {
            show_stats(&self.pb, objects, stats);
        } else {
            log::info!("{}: {} objects, {stats}", self.label, fmt_num(objects as usize));
        }
    }

    pub(crate) fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
