//! In-memory deduplication of collected rows.
//!
//! Memory grows with the number of collected rows, not with the node count,
//! so callers must opt in and pass a row limit. The streaming edge pass never
//! uses this: duplicate source rows are kept there on purpose.

use std::collections::HashSet;

use crate::error::{KgError, Result};
use crate::scan::Record;

/// Collapse rows with identical field tuples, keeping the first occurrence
/// and the original order. Line numbers do not take part in the comparison.
///
/// Fails with `DedupLimit` before doing any work if `rows` exceeds `max_rows`.
pub fn dedup_records(rows: Vec<Record>, max_rows: usize) -> Result<Vec<Record>> {
    if rows.len() > max_rows {
        return Err(KgError::DedupLimit { limit: max_rows });
    }

    let keep: Vec<bool> = {
        let mut seen: HashSet<&[String]> = HashSet::with_capacity(rows.len());
        rows.iter().map(|r| seen.insert(r.fields())).collect()
    };

    let before = rows.len();
    let unique: Vec<Record> = rows
        .into_iter()
        .zip(keep)
        .filter_map(|(row, first)| first.then_some(row))
        .collect();
    log::info!("dedup: {} rows -> {} unique", before, unique.len());
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(line: u64, fields: &[&str]) -> Record {
        Record::from_fields(line, fields.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn test_keeps_first_occurrence_in_order() {
        let rows = vec![
            row(1, &["A", "RO", "B"]),
            row(2, &["B", "RO", "C"]),
            row(3, &["A", "RO", "B"]),
            row(4, &["A", "RB", "B"]),
        ];
        let unique = dedup_records(rows, 10).unwrap();
        let lines: Vec<u64> = unique.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn test_guard_refuses_oversized_input() {
        let rows = vec![row(1, &["A"]), row(2, &["B"]), row(3, &["C"])];
        let err = dedup_records(rows, 2).unwrap_err();
        assert!(matches!(err, KgError::DedupLimit { limit: 2 }));
    }
}
