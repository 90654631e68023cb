//! Chunked streaming reader for fixed-schema delimited files.
//!
//! A [`Scanner`] is a path plus a schema plus options. Every call to
//! [`Scanner::chunks`] or [`Scanner::scan`] re-opens the file, so the same
//! scanner serves each hop of discovery and every later pass. Only one chunk
//! is alive at a time on the inline path; with `prefetch_chunks > 0` a single
//! reader thread runs ahead by at most that many chunks.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use crate::cancel::CancelFlag;
use crate::error::{KgError, Result};
use crate::scan::record::Record;
use crate::scan::schema::Schema;

pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// What to do with a line that does not fit the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Log it, count it, keep scanning.
    #[default]
    Skip,
    /// Abort the scan with `KgError::Malformed`.
    Fail,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum records per chunk.
    pub chunk_size: usize,
    pub delimiter: char,
    pub on_malformed: MalformedPolicy,
    /// Skip the first line (files written by this crate carry a header).
    pub has_header: bool,
    /// Chunks the reader thread may run ahead; 0 reads inline.
    pub prefetch_chunks: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            delimiter: '|',
            on_malformed: MalformedPolicy::Skip,
            has_header: false,
            prefetch_chunks: 0,
        }
    }
}

impl ScanOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }
}

/// A bounded, ordered batch of records.
#[derive(Debug)]
pub struct Chunk {
    /// 0-based position of this chunk in the file.
    pub index: usize,
    pub records: Vec<Record>,
}

/// Counters for one full pass over a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub lines: u64,
    pub records: u64,
    pub skipped_malformed: u64,
    pub chunks: usize,
}

#[derive(Debug, Clone)]
pub struct Scanner {
    path: PathBuf,
    schema: Schema,
    options: ScanOptions,
}

impl Scanner {
    pub fn new(path: impl AsRef<Path>, schema: Schema, options: ScanOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            schema,
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Open the file and return a lazy chunk iterator over it.
    pub fn chunks(&self) -> Result<ChunkIter> {
        if self.options.chunk_size == 0 {
            return Err(KgError::InvalidInput("chunk_size must be greater than 0".to_string()));
        }
        let file = File::open(&self.path).map_err(|e| KgError::io(&self.path, e))?;
        Ok(ChunkIter {
            reader: BufReader::new(file),
            path: self.path.clone(),
            schema: self.schema,
            options: self.options.clone(),
            buf: Vec::new(),
            line: 0,
            next_index: 0,
            stats: ScanStats::default(),
            done: false,
        })
    }

    /// Feed every chunk of the file to `f`, in order.
    ///
    /// `cancel` is checked before each chunk is handed over; `stage` names
    /// the pass in the resulting `Cancelled` error.
    pub fn scan<F>(&self, cancel: &CancelFlag, stage: &str, mut f: F) -> Result<ScanStats>
    where
        F: FnMut(Chunk) -> Result<()>,
    {
        let mut iter = self.chunks()?;

        if self.options.prefetch_chunks == 0 {
            for item in iter.by_ref() {
                cancel.check(stage)?;
                f(item?)?;
            }
            return Ok(iter.into_stats());
        }

        let depth = self.options.prefetch_chunks;
        std::thread::scope(|s| -> Result<ScanStats> {
            let (tx, rx) = mpsc::sync_channel::<Result<Chunk>>(depth);
            let reader_cancel = cancel.clone();
            let reader = s.spawn(move || {
                while !reader_cancel.is_cancelled() {
                    let Some(item) = iter.next() else { break };
                    let failed = item.is_err();
                    if tx.send(item).is_err() || failed {
                        break;
                    }
                }
                iter.into_stats()
            });

            let mut outcome = Ok(());
            for item in rx.iter() {
                if let Err(e) = cancel.check(stage).and(item).and_then(&mut f) {
                    outcome = Err(e);
                    break;
                }
            }
            // Unblocks a reader parked on a full queue.
            drop(rx);

            let stats = match reader.join() {
                Ok(stats) => stats,
                Err(panic) => std::panic::resume_unwind(panic),
            };
            outcome?;
            // The reader stops early on cancellation without sending an error.
            cancel.check(stage)?;
            Ok(stats)
        })
    }
}

/// Lazy iterator of chunks over one open file.
pub struct ChunkIter {
    reader: BufReader<File>,
    path: PathBuf,
    schema: Schema,
    options: ScanOptions,
    buf: Vec<u8>,
    line: u64,
    next_index: usize,
    stats: ScanStats,
    done: bool,
}

impl ChunkIter {
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn into_stats(self) -> ScanStats {
        self.stats
    }

    /// Read one line into `buf`, without its line terminator.
    /// Returns `Ok(false)` at end of file.
    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(|e| KgError::io(&self.path, e))?;
        if n == 0 {
            return Ok(false);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        self.line += 1;
        self.stats.lines += 1;
        Ok(true)
    }

    fn malformed(&mut self, reason: String) -> Result<()> {
        match self.options.on_malformed {
            MalformedPolicy::Fail => Err(KgError::Malformed {
                path: self.path.clone(),
                line: self.line,
                reason,
            }),
            MalformedPolicy::Skip => {
                log::warn!(
                    "Skipping malformed line {} in {}: {}",
                    self.line,
                    self.path.display(),
                    reason
                );
                self.stats.skipped_malformed += 1;
                Ok(())
            }
        }
    }

    fn fill_chunk(&mut self) -> Result<Option<Chunk>> {
        let mut records = Vec::with_capacity(self.options.chunk_size.min(DEFAULT_CHUNK_SIZE));

        while records.len() < self.options.chunk_size {
            if !self.read_line()? {
                break;
            }
            if self.options.has_header && self.line == 1 {
                continue;
            }

            let parsed = match std::str::from_utf8(&self.buf) {
                Ok(text) => Record::parse(text, self.line, &self.schema, self.options.delimiter),
                Err(e) => Err(format!("invalid UTF-8: {}", e)),
            };
            match parsed {
                Ok(record) => records.push(record),
                Err(reason) => self.malformed(reason)?,
            }
        }

        if records.is_empty() {
            return Ok(None);
        }

        self.stats.records += records.len() as u64;
        self.stats.chunks += 1;
        let index = self.next_index;
        self.next_index += 1;
        log::debug!(
            "{}: chunk {} ({} records, through line {})",
            self.path.display(),
            index,
            records.len(),
            self.line
        );
        Ok(Some(Chunk { index, records }))
    }
}

impl Iterator for ChunkIter {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.fill_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
