//! Terminal edge pass: keep rows whose endpoints are all in the node set.

use std::io::Write;
use std::time::Instant;

use crate::cancel::CancelFlag;
use crate::error::Result;
use crate::output::{PassReport, RowWriter};
use crate::scan::{Combinator, KeyMatcher, KeySet, Scanner};

/// Stream every edge with both endpoints in `nodes` to `sink`, in file order.
///
/// Duplicate source rows are written as many times as they occur.
pub fn materialize<W: Write>(
    scanner: &Scanner,
    nodes: &KeySet,
    sink: &mut RowWriter<W>,
    cancel: &CancelFlag,
) -> Result<PassReport> {
    let start = Instant::now();
    let before = sink.rows();
    let matcher = KeyMatcher::new(nodes, scanner.schema().keys, Combinator::All);

    let scan = scanner.scan(cancel, "materialization", |chunk| {
        for record in chunk.records.iter().filter(|r| matcher.matches(r)) {
            sink.write_record(record)?;
        }
        Ok(())
    })?;

    let rows_kept = sink.rows() - before;
    if rows_kept == 0 {
        log::info!("materialization: no edges inside the node set");
    }
    log::info!(
        "materialization: lines_kept={}, chunks={}, skipped_malformed={}, cost={:?}",
        rows_kept,
        scan.chunks,
        scan.skipped_malformed,
        start.elapsed()
    );

    Ok(PassReport {
        name: "edges".to_string(),
        rows_kept,
        scan,
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}
