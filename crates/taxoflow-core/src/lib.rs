//! Taxoflow Core - batch streaming pipeline infrastructure
//!
//! This crate provides the entity-agnostic pieces shared by every taxonomy
//! job: the batch processor, pass-through stream stages, run statistics,
//! and the logging/progress/cancellation plumbing around them.

pub mod batch;
pub mod cancel;
pub mod error;
pub mod logging;
pub mod progress;
pub mod stage;

// Re-exports for convenience
pub use batch::{
    BatchOperation, BatchOutcome, BatchProcessor, DEFAULT_BATCH_SIZE, RowsProcessedStats,
};
pub use cancel::CancelToken;
pub use error::PipelineError;
pub use logging::{Verbosity, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num, show_stats};
pub use stage::{
    Chain, Document, DocumentToObject, ObjectCount, ObjectCounter, PlainRecord, Stage,
    StageStreamExt,
};
