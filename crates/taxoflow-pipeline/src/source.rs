//! JSON-lines row source
//!
//! One JSON object per line, column name to scalar value. Blank lines are
//! skipped. A line that does not parse, including one that is not valid
//! UTF-8, is a per-row failure. An I/O error ends the source.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use futures_util::{Stream, stream};
use taxoflow_core::PipelineError;
use taxoflow_model::{RawRow, RowError};

/// Initial capacity for the per-line read buffer
const LINE_BUF_CAPACITY: usize = 4096;

/// One source line, parsed or not.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    /// 1-based line number in the source
    pub line: usize,
    pub row: Result<RawRow, RowError>,
}

impl SourceRow {
    pub fn parsed(line: usize, row: RawRow) -> Self {
        Self { line, row: Ok(row) }
    }
}

/// Iterator over the rows of a JSON-lines reader.
pub struct JsonlRows<R> {
    reader: R,
    buf: Vec<u8>,
    line: usize,
    done: bool,
}

impl<R: BufRead> JsonlRows<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(LINE_BUF_CAPACITY),
            line: 0,
            done: false,
        }
    }

    /// Adapt into a stream for the orchestrators.
    pub fn into_stream(self) -> impl Stream<Item = Result<SourceRow, PipelineError>> {
        stream::iter(self)
    }
}

impl<R: BufRead> Iterator for JsonlRows<R> {
    type Item = Result<SourceRow, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line += 1;
                    let bytes = self.buf.trim_ascii();
                    if bytes.is_empty() {
                        continue;
                    }
                    let row = serde_json::from_slice::<RawRow>(bytes)
                        .map_err(|e| RowError::malformed(e.to_string()).at_line(self.line));
                    return Some(Ok(SourceRow {
                        line: self.line,
                        row,
                    }));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
        None
    }
}

/// Open a JSON-lines file as a row source.
pub fn open_rows(path: &Path) -> Result<JsonlRows<BufReader<File>>, PipelineError> {
    let file = File::open(path)?;
    Ok(JsonlRows::new(BufReader::new(file)))
}

/// Row source over rows already in memory, numbered from 1.
pub fn rows_from_iter<I>(rows: I) -> impl Stream<Item = Result<SourceRow, PipelineError>>
where
    I: IntoIterator<Item = RawRow>,
{
    stream::iter(
        rows.into_iter()
            .enumerate()
            .map(|(i, row)| Ok(SourceRow::parsed(i + 1, row))),
    )
}
