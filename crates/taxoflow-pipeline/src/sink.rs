//! Record sinks for the export pipeline

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use taxoflow_core::{BatchOutcome, PipelineError, PlainRecord};
use taxoflow_store::tmp_path;

/// Destination for exported records, written one batch at a time.
pub trait RecordSink {
    fn write_batch(&mut self, records: Vec<PlainRecord>) -> Result<BatchOutcome, PipelineError>;
}

/// Collects records in memory.
impl RecordSink for Vec<PlainRecord> {
    fn write_batch(&mut self, records: Vec<PlainRecord>) -> Result<BatchOutcome, PipelineError> {
        let outcome = BatchOutcome::all_succeeded(records.len());
        self.extend(records);
        Ok(outcome)
    }
}

/// JSON-lines file writer with atomic tmp→rename
pub struct JsonlSink {
    writer: BufWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    written: usize,
}

impl std::fmt::Debug for JsonlSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlSink")
            .field("final_path", &self.final_path)
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

impl JsonlSink {
    /// Start writing to `<path>.tmp`; `path` only appears on [`finish`](Self::finish).
    pub fn create(path: &Path) -> Result<Self, PipelineError> {
        let tmp_path = tmp_path(path);
        if tmp_path.exists() {
            log::warn!("Removing stale tmp file: {}", tmp_path.display());
            fs::remove_file(&tmp_path)?;
        }
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = File::create(&tmp_path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            tmp_path,
            final_path: path.to_path_buf(),
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and atomically rename tmp → final. Returns the number of records written.
    pub fn finish(mut self) -> Result<usize, PipelineError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(self.written)
    }

    /// Drop the partial output: close and remove `<path>.tmp`.
    pub fn abort(self) -> Result<(), PipelineError> {
        let Self { writer, tmp_path, .. } = self;
        drop(writer);
        match fs::remove_file(&tmp_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl RecordSink for JsonlSink {
    fn write_batch(&mut self, records: Vec<PlainRecord>) -> Result<BatchOutcome, PipelineError> {
        let len = records.len();
        for record in &records {
            serde_json::to_writer(&mut self.writer, record)?;
            self.writer.write_all(b"\n")?;
        }
        self.written += len;
        Ok(BatchOutcome::all_succeeded(len))
    }
}
