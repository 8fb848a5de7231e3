//! Run outcomes: the summary of a finished run and the failure of an aborted one

use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use taxoflow_core::{BatchOperation, BatchProcessor, PipelineError, RowsProcessedStats, fmt_num};
use taxoflow_model::Collection;
use taxoflow_store::JobKind;

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub kind: JobKind,
    pub model_id: String,
    /// Collection read or written; `None` for centrality
    pub collection: Option<Collection>,
    pub stats: RowsProcessedStats,
    /// Objects that passed the source-side counter
    pub objects_seen: u64,
    pub batches: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn log(&self) {
        log::info!("=== {} Summary ===", self.title());
        log::info!("Model: {}", self.model_id);
        if let Some(collection) = self.collection {
            log::info!("Collection: {collection}");
        }
        log::info!(
            "Rows: {} processed, {} ok, {} failed",
            fmt_num(self.stats.rows_processed),
            fmt_num(self.stats.rows_success),
            fmt_num(self.stats.rows_failed)
        );
        log::info!(
            "Objects: {} in {} batches",
            fmt_num(self.objects_seen as usize),
            self.batches
        );
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
        if self.stats.rows_processed > 0 && !self.elapsed.is_zero() {
            let rows_per_sec = self.stats.rows_processed as f64 / self.elapsed.as_secs_f64();
            log::info!("Throughput: {rows_per_sec:.0} rows/sec");
        }
    }

    /// Key-value table for terminal output
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new(self.title()).fg(Color::Cyan),
                Cell::new("Value").fg(Color::Cyan),
            ]);

        let mut rows = vec![("Model", self.model_id.clone())];
        if let Some(collection) = self.collection {
            rows.push(("Collection", collection.to_string()));
        }
        rows.extend([
            ("Rows processed", fmt_num(self.stats.rows_processed)),
            ("Rows ok", fmt_num(self.stats.rows_success)),
            ("Rows failed", fmt_num(self.stats.rows_failed)),
            ("Objects", fmt_num(self.objects_seen as usize)),
            ("Batches", self.batches.to_string()),
            ("Time", format!("{:.1}s", self.elapsed.as_secs_f64())),
        ]);

        for (label, value) in rows {
            let value_cell = if label == "Rows failed" && self.stats.rows_failed > 0 {
                Cell::new(value).fg(Color::Red)
            } else {
                Cell::new(value)
            };
            table.add_row(vec![Cell::new(label), value_cell]);
        }
        table
    }

    fn title(&self) -> &'static str {
        match self.kind {
            JobKind::Import => "Import",
            JobKind::Export => "Export",
            JobKind::Centrality => "Centrality",
        }
    }
}

/// A run that stopped on a fatal error, with the stats it had reached.
#[derive(Debug)]
pub struct RunFailure {
    pub partial: RowsProcessedStats,
    pub error: PipelineError,
}

impl RunFailure {
    pub fn new(partial: RowsProcessedStats, error: PipelineError) -> Self {
        Self { partial, error }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, PipelineError::Cancelled)
    }
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (after {})", self.error, self.partial)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Failures before any batch ran carry empty stats.
impl From<PipelineError> for RunFailure {
    fn from(error: PipelineError) -> Self {
        Self::new(RowsProcessedStats::default(), error)
    }
}

/// Processor stats plus the rows rejected before reaching it.
pub(crate) fn stats_so_far<T, Op: BatchOperation<T>>(
    processor: &BatchProcessor<T, Op>,
    rejected: usize,
) -> RowsProcessedStats {
    processor
        .stats()
        .merge(RowsProcessedStats::rejected(rejected))
}

/// Cancellation is expected and only warned about; anything else is an error.
pub(crate) fn log_failure(what: &str, error: &PipelineError) {
    if matches!(error, PipelineError::Cancelled) {
        log::warn!("{what} cancelled");
    } else {
        log::error!("{what} failed: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary {
            kind: JobKind::Import,
            model_id: "m1".into(),
            collection: Some(Collection::Skills),
            stats: RowsProcessedStats {
                rows_processed: 1200,
                rows_success: 1199,
                rows_failed: 1,
            },
            objects_seen: 1200,
            batches: 2,
            elapsed: Duration::from_secs(3),
        }
    }

    #[test]
    fn log_does_not_panic() {
        summary().log();
        let empty = RunSummary {
            stats: RowsProcessedStats::default(),
            elapsed: Duration::ZERO,
            ..summary()
        };
        empty.log();
    }

    #[test]
    fn table_lists_stats() {
        let rendered = summary().to_table().to_string();
        assert!(rendered.contains("Import"));
        assert!(rendered.contains("1,200"));
        assert!(rendered.contains("skills"));
    }

    #[test]
    fn failure_display_includes_partial() {
        let failure = RunFailure::new(
            RowsProcessedStats {
                rows_processed: 3,
                rows_success: 3,
                rows_failed: 0,
            },
            PipelineError::repository("insert", "connection reset"),
        );
        let msg = failure.to_string();
        assert!(msg.contains("connection reset"));
        assert!(msg.contains("3 processed"));
        assert!(!failure.is_cancelled());
        assert!(RunFailure::from(PipelineError::Cancelled).is_cancelled());
    }
}
