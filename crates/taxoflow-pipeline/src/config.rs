//! Pipeline tuning knobs

use serde::{Deserialize, Serialize};
use taxoflow_core::DEFAULT_BATCH_SIZE;

/// Runtime configuration shared by the import, export and centrality runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Records per repository insert / sink write
    pub batch_size: usize,
    /// Skills per degree-centrality update
    pub centrality_batch_size: usize,
    /// Refresh progress every N objects
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            centrality_batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: 10_000,
        }
    }
}
