//! One-hop neighborhood of a single node, collected in memory.

use crate::cancel::CancelFlag;
use crate::error::{KgError, Result};
use crate::scan::{KeySet, NodeId, Record, ScanStats, Scanner};

/// Rows touching the seed plus the set of nodes on their other end.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    pub seed: NodeId,
    /// Never contains the seed itself, even for self-loops.
    pub neighbors: KeySet,
    pub rows: Vec<Record>,
    pub scan: ScanStats,
}

/// Single scan keeping every row with an endpoint equal to `seed`.
///
/// Rows are held in memory, so this is only for small neighborhoods; the
/// multi-hop path is [`crate::graph::discover`] + [`crate::graph::materialize`].
pub fn direct_neighbors(scanner: &Scanner, seed: &NodeId, cancel: &CancelFlag) -> Result<Neighborhood> {
    if seed.is_empty() {
        return Err(KgError::InvalidInput("seed identifier is empty".to_string()));
    }
    let endpoints = scanner.schema().keys;
    let mut neighbors = KeySet::new();
    let mut rows = Vec::new();

    let scan = scanner.scan(cancel, "direct neighbors", |chunk| {
        let before = rows.len();
        for record in chunk.records {
            if !endpoints.iter().any(|&c| record.get(c) == seed.as_str()) {
                continue;
            }
            for &column in endpoints {
                let value = record.get(column);
                if value != seed.as_str() {
                    neighbors.insert(NodeId::new(value));
                }
            }
            rows.push(record);
        }
        if rows.len() > before {
            log::info!("Data found in chunk {}, rows: {}", chunk.index, rows.len() - before);
        }
        Ok(())
    })?;

    if rows.is_empty() {
        log::info!("No rows touching {} in {}", seed, scanner.path().display());
    }
    log::info!("Found {} neighbors of {} ({} rows)", neighbors.len(), seed, rows.len());

    Ok(Neighborhood {
        seed: seed.clone(),
        neighbors,
        rows,
        scan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::edge_file;
    use crate::scan::{ScanOptions, EDGES};
    use tempfile::TempDir;

    #[test]
    fn test_collects_rows_and_neighbors() {
        let dir = TempDir::new().unwrap();
        let path = edge_file(
            &dir,
            &[("A", "r", "B"), ("C", "r", "a"), ("B", "r", "C"), ("A", "r", "A"), ("A", "r", "B")],
        );
        let scanner = Scanner::new(path, EDGES, ScanOptions::default().with_chunk_size(2));
        let hood = direct_neighbors(&scanner, &NodeId::new("a"), &CancelFlag::new()).unwrap();

        let lines: Vec<u64> = hood.rows.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 2, 4, 5]);
        assert_eq!(hood.neighbors.len(), 2);
        assert!(hood.neighbors.contains("B"));
        assert!(hood.neighbors.contains("C"));
        assert!(!hood.neighbors.contains("A"));
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let path = edge_file(&dir, &[("X", "r", "Y")]);
        let scanner = Scanner::new(path, EDGES, ScanOptions::default());
        let hood = direct_neighbors(&scanner, &NodeId::new("A"), &CancelFlag::new()).unwrap();
        assert!(hood.rows.is_empty());
        assert!(hood.neighbors.is_empty());
        assert_eq!(hood.scan.records, 1);
    }
}
