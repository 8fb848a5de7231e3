//! Common error type for batch pipelines

/// Fatal error raised by a pipeline stage, a batch operation, or a collaborator.
///
/// Per-row rejections are never represented here; they are counted in a
/// [`BatchOutcome`](crate::batch::BatchOutcome) instead.
#[derive(Debug)]
pub enum PipelineError {
    /// `BatchProcessor` built with a batch size of zero
    InvalidBatchSize(usize),
    /// `add` or `flush` called after the processor was flushed or failed
    ProcessorClosed,
    /// A document could not be turned into a plain record
    Materialize(String),
    /// A downstream stage refused an item
    Downstream(String),
    /// The repository or job store rejected a whole call
    Repository {
        operation: &'static str,
        message: String,
    },
    /// The run was stopped through its cancel token
    Cancelled,
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBatchSize(n) => write!(f, "batch size must be positive, got {n}"),
            Self::ProcessorClosed => write!(f, "batch processor already flushed"),
            Self::Materialize(msg) => write!(f, "materialize: {msg}"),
            Self::Downstream(msg) => write!(f, "downstream: {msg}"),
            Self::Repository { operation, message } => {
                write!(f, "repository {operation}: {message}")
            }
            Self::Cancelled => write!(f, "cancelled"),
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Json(e) => write!(f, "JSON: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl PipelineError {
    pub fn repository(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Repository {
            operation,
            message: message.into(),
        }
    }

    /// Whether an outer job runner may reasonably re-run the job.
    ///
    /// Misuse, bad data and cancellation are not retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Repository { .. } => true,
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
            Self::InvalidBatchSize(_)
            | Self::ProcessorClosed
            | Self::Materialize(_)
            | Self::Downstream(_)
            | Self::Cancelled
            | Self::Json(_) => false,
        }
    }
}
