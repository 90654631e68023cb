//! Single-pass key-set projection of attribute files.

use std::io::Write;
use std::time::Instant;

use crate::cancel::CancelFlag;
use crate::error::Result;
use crate::output::{PassReport, RowWriter};
use crate::project::predicate::RowPredicate;
use crate::scan::{normalize_key, KeySet, Scanner};

/// Stream rows whose `key_column` is in `keys` (and which satisfy `predicate`,
/// if given) from `source` to `sink`, in file order.
pub fn project<W: Write>(
    name: &str,
    source: &Scanner,
    key_column: usize,
    keys: &KeySet,
    predicate: Option<&dyn RowPredicate>,
    sink: &mut RowWriter<W>,
    cancel: &CancelFlag,
) -> Result<PassReport> {
    let start = Instant::now();
    let before = sink.rows();
    // Schema key columns arrive normalized; anything else is normalized here.
    let normalized = source.schema().is_key(key_column);
    let stage = format!("projection {}", name);

    log::info!(
        "[{}] Reading {} ({} keys{})",
        name,
        source.path().display(),
        keys.len(),
        predicate
            .map(|p| format!(", {}", p.describe()))
            .unwrap_or_default()
    );

    let scan = source.scan(cancel, &stage, |chunk| {
        let mut matched = 0usize;
        for record in &chunk.records {
            let key_hit = if normalized {
                keys.contains(record.get(key_column))
            } else {
                keys.contains(&normalize_key(record.get(key_column)))
            };
            if key_hit && predicate.map_or(true, |p| p.holds(record)) {
                sink.write_record(record)?;
                matched += 1;
            }
        }
        log::debug!("[{}] chunk {}: matched rows={}", name, chunk.index, matched);
        Ok(())
    })?;

    let rows_kept = sink.rows() - before;
    if rows_kept == 0 {
        log::info!("[{}] no matching rows in the entire file", name);
    }
    log::info!(
        "[{}] Done. rows_kept={}, chunks={}, skipped_malformed={}, cost={:?}",
        name,
        rows_kept,
        scan.chunks,
        scan.skipped_malformed,
        start.elapsed()
    );

    Ok(PassReport {
        name: name.to_string(),
        rows_kept,
        scan,
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::FieldEquals;
    use crate::scan::{NodeId, Record, ScanOptions, Schema, SEMANTIC_TYPES};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Minimal three-column attribute layout: key, language, text.
    const LABELS: Schema = Schema {
        name: "labels",
        columns: &["ID", "LANG", "TEXT"],
        keys: &[0],
    };

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn keys(ids: &[&str]) -> KeySet {
        ids.iter().map(|id| NodeId::new(id)).collect()
    }

    fn run(
        scanner: &Scanner,
        key_column: usize,
        keys: &KeySet,
        predicate: Option<&dyn RowPredicate>,
    ) -> (Vec<String>, PassReport) {
        let mut sink = RowWriter::new(Vec::new(), "mem", scanner.schema(), '|').unwrap();
        let report = project("test", scanner, key_column, keys, predicate, &mut sink, &CancelFlag::new())
            .unwrap();
        let text = String::from_utf8(sink.finish().unwrap()).unwrap();
        (text.lines().skip(1).map(str::to_string).collect(), report)
    }

    #[test]
    fn test_key_and_language_predicate() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "labels", "A|EN|foo\nA|FR|bar\nC|EN|baz\n");
        let scanner = Scanner::new(path, LABELS, ScanOptions::default());
        let lang = FieldEquals::new(&LABELS, "LANG", "EN").unwrap();

        let (rows, report) = run(&scanner, 0, &keys(&["A", "B"]), Some(&lang));
        assert_eq!(rows, vec!["A|EN|foo"]);
        assert_eq!(report.rows_kept, 1);
        assert_eq!(report.scan.records, 3);
    }

    #[test]
    fn test_without_predicate_keeps_all_key_matches() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "labels", "A|EN|foo\nA|FR|bar\nC|EN|baz\nb|DE|qux\n");
        let scanner = Scanner::new(path, LABELS, ScanOptions::default().with_chunk_size(1));

        let (rows, _) = run(&scanner, 0, &keys(&["A", "B"]), None);
        assert_eq!(rows, vec!["A|EN|foo", "A|FR|bar", "B|DE|qux"]);
    }

    #[test]
    fn test_non_key_column_is_normalized_on_lookup() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "labels", "x1|en|foo\nx2|fr|bar\n");
        let scanner = Scanner::new(path, LABELS, ScanOptions::default());

        let (rows, _) = run(&scanner, 1, &keys(&["EN"]), None);
        assert_eq!(rows, vec!["X1|en|foo"]);
    }

    #[test]
    fn test_semantic_types_projection() {
        let dir = TempDir::new().unwrap();
        let body = "C1|T047|B2.2.1.2.1|Disease or Syndrome|AT1|256|\n\
                    C2|T184|A2.2.2|Sign or Symptom|AT2|256|\n\
                    C1|T191|B2.2.1.2.1.2|Neoplastic Process|AT3|256|\n";
        let path = write(&dir, "MRSTY.RRF", body);
        let scanner = Scanner::new(path, SEMANTIC_TYPES, ScanOptions::default());

        let (rows, report) = run(&scanner, 0, &keys(&["c1"]), None);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.starts_with("C1|")));
        assert_eq!(report.name, "test");
    }

    #[test]
    fn test_closure_predicate() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "labels", "A|EN|foo\nA|EN|\n");
        let scanner = Scanner::new(path, LABELS, ScanOptions::default());
        let non_empty = |r: &Record| !r.get(2).is_empty();

        let (rows, _) = run(&scanner, 0, &keys(&["A"]), Some(&non_empty));
        assert_eq!(rows, vec!["A|EN|foo"]);
    }

    #[test]
    fn test_empty_key_set_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "labels", "A|EN|foo\n");
        let scanner = Scanner::new(path, LABELS, ScanOptions::default());
        let (rows, report) = run(&scanner, 0, &KeySet::new(), None);
        assert!(rows.is_empty());
        assert_eq!(report.rows_kept, 0);
    }
}
