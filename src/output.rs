//! Output sinks: delimited row files with a header, sorted node lists, digests.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{KgError, Result};
use crate::scan::{KeySet, NodeId, Record, ScanStats, Schema};

/// Outcome of one filtering pass that wrote rows to a sink.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub name: String,
    pub rows_kept: u64,
    pub scan: ScanStats,
    pub elapsed_ms: u64,
}

/// Delimited row sink. The header is written on construction.
pub struct RowWriter<W: Write> {
    inner: W,
    target: PathBuf,
    delimiter: char,
    rows: u64,
}

impl RowWriter<BufWriter<File>> {
    /// Create (truncate) `path` and write the schema header.
    pub fn create(path: &Path, schema: &Schema, delimiter: char) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| KgError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| KgError::io(path, e))?;
        RowWriter::new(BufWriter::new(file), path, schema, delimiter)
    }
}

impl<W: Write> RowWriter<W> {
    /// `target` only labels errors; `inner` can be any writer.
    pub fn new(inner: W, target: impl Into<PathBuf>, schema: &Schema, delimiter: char) -> Result<Self> {
        let mut writer = Self {
            inner,
            target: target.into(),
            delimiter,
            rows: 0,
        };
        let header = schema.header(delimiter);
        writer.write_line(&header)?;
        Ok(writer)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.inner, "{}", line).map_err(|e| KgError::io(&self.target, e))
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let line = record.join(self.delimiter);
        self.write_line(&line)?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far (header excluded).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush().map_err(|e| KgError::io(&self.target, e))?;
        Ok(self.inner)
    }
}

/// Write one identifier per line, sorted lexicographically.
pub fn write_node_list(path: &Path, nodes: &KeySet) -> Result<usize> {
    let file = File::create(path).map_err(|e| KgError::io(path, e))?;
    let mut out = BufWriter::new(file);
    let sorted = nodes.sorted();
    for node in &sorted {
        writeln!(out, "{}", node).map_err(|e| KgError::io(path, e))?;
    }
    out.flush().map_err(|e| KgError::io(path, e))?;
    Ok(sorted.len())
}

/// Read a node list back; identifiers are re-normalized and blank lines ignored.
pub fn read_node_list(path: &Path) -> Result<KeySet> {
    let file = File::open(path).map_err(|e| KgError::io(path, e))?;
    let mut nodes = KeySet::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| KgError::io(path, e))?;
        nodes.insert(NodeId::new(&line));
    }
    Ok(nodes)
}

/// SHA-256 of a file's contents, streamed.
pub fn file_digest(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| KgError::io(path, e))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut BufReader::new(file), &mut hasher).map_err(|e| KgError::io(path, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}
