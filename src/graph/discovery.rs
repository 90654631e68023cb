//! Out-of-core BFS: one full scan of the edge file per hop, nodes only.
//!
//! Edges touching the frontier are never buffered; each hop keeps just the
//! candidate endpoint set, so memory scales with the node count rather than
//! with the (much larger) number of matching edges.

use std::time::Instant;

use serde::Serialize;

use crate::cancel::CancelFlag;
use crate::error::{KgError, Result};
use crate::scan::{Combinator, KeyMatcher, KeySet, NodeId, Scanner};

/// Counters for one completed hop.
#[derive(Debug, Clone, Serialize)]
pub struct HopReport {
    pub hop: usize,
    pub frontier_size: usize,
    pub rows_matched: u64,
    pub candidates: usize,
    pub newly_found: usize,
    pub visited_size: usize,
    pub chunks: usize,
    pub skipped_malformed: u64,
    pub elapsed_ms: u64,
}

/// Why discovery stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    HopLimit,
    FrontierExhausted,
}

/// Frontier and visited set carried across hops.
#[derive(Debug, Clone)]
pub struct DiscoveryState {
    frontier: KeySet,
    visited: KeySet,
    hops_completed: usize,
}

impl DiscoveryState {
    pub fn seeded(seed: NodeId) -> Self {
        Self {
            frontier: KeySet::singleton(seed.clone()),
            visited: KeySet::singleton(seed),
            hops_completed: 0,
        }
    }

    pub fn frontier(&self) -> &KeySet {
        &self.frontier
    }

    pub fn visited(&self) -> &KeySet {
        &self.visited
    }

    pub fn hops_completed(&self) -> usize {
        self.hops_completed
    }

    /// Fold one hop's candidates in. Returns the number of new nodes.
    fn advance(&mut self, candidates: &KeySet) -> usize {
        let newly_found = candidates.difference(&self.visited);
        self.visited.absorb(candidates);
        self.frontier = newly_found;
        self.hops_completed += 1;
        self.frontier.len()
    }
}

/// Final node set of a discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    pub visited: KeySet,
    pub hops: Vec<HopReport>,
    pub stop: StopReason,
}

/// Hop-by-hop driver over an edge file.
pub struct Discovery<'a> {
    scanner: &'a Scanner,
    state: DiscoveryState,
    max_hops: usize,
    hops: Vec<HopReport>,
}

impl<'a> Discovery<'a> {
    pub fn new(scanner: &'a Scanner, seed: NodeId, max_hops: usize) -> Result<Self> {
        if seed.is_empty() {
            return Err(KgError::InvalidInput("seed identifier is empty".to_string()));
        }
        if scanner.schema().keys.is_empty() {
            return Err(KgError::InvalidInput(format!(
                "schema {} has no endpoint columns",
                scanner.schema().name
            )));
        }
        Ok(Self {
            scanner,
            state: DiscoveryState::seeded(seed),
            max_hops,
            hops: Vec::new(),
        })
    }

    pub fn state(&self) -> &DiscoveryState {
        &self.state
    }

    /// The hop `step` would run next, if any.
    pub fn next_hop(&self) -> Option<usize> {
        if self.state.hops_completed >= self.max_hops || self.state.frontier.is_empty() {
            return None;
        }
        Some(self.state.hops_completed + 1)
    }

    /// Run one hop: a full scan matching rows with any endpoint in the frontier.
    /// Returns `None` once the hop limit is reached or the frontier is empty.
    pub fn step(&mut self, cancel: &CancelFlag) -> Result<Option<HopReport>> {
        let Some(hop) = self.next_hop() else {
            return Ok(None);
        };
        let start = Instant::now();
        let endpoints = self.scanner.schema().keys;
        let frontier_size = self.state.frontier.len();
        log::info!("hop={}: frontier_size={}", hop, frontier_size);

        let matcher = KeyMatcher::new(&self.state.frontier, endpoints, Combinator::Any);
        let mut candidates = KeySet::new();
        let mut rows_matched = 0u64;
        let stage = format!("discovery hop {}", hop);

        let stats = self.scanner.scan(cancel, &stage, |chunk| {
            for record in chunk.records.iter().filter(|r| matcher.matches(r)) {
                rows_matched += 1;
                for &column in endpoints {
                    candidates.insert(NodeId::new(record.get(column)));
                }
            }
            Ok(())
        })?;

        let newly_found = self.state.advance(&candidates);
        let report = HopReport {
            hop,
            frontier_size,
            rows_matched,
            candidates: candidates.len(),
            newly_found,
            visited_size: self.state.visited.len(),
            chunks: stats.chunks,
            skipped_malformed: stats.skipped_malformed,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        log::info!(
            "hop={} done: chunks={}, rows_matched={}, newly_found={}, visited={}, cost={:?}",
            hop,
            report.chunks,
            report.rows_matched,
            report.newly_found,
            report.visited_size,
            start.elapsed()
        );
        if newly_found == 0 {
            log::info!("hop={}: no new nodes, frontier exhausted", hop);
        }

        self.hops.push(report.clone());
        Ok(Some(report))
    }

    pub fn finish(self) -> DiscoveryOutcome {
        let stop = if self.state.frontier.is_empty() {
            StopReason::FrontierExhausted
        } else {
            StopReason::HopLimit
        };
        DiscoveryOutcome {
            visited: self.state.visited,
            hops: self.hops,
            stop,
        }
    }
}

/// Discover every node within `max_hops` of `seed`.
pub fn discover(
    scanner: &Scanner,
    seed: &NodeId,
    max_hops: usize,
    cancel: &CancelFlag,
) -> Result<DiscoveryOutcome> {
    let mut discovery = Discovery::new(scanner, seed.clone(), max_hops)?;
    while discovery.step(cancel)?.is_some() {}
    let outcome = discovery.finish();
    log::info!(
        "discovery from {} finished after {} hop(s) ({:?}), total nodes={}",
        seed,
        outcome.hops.len(),
        outcome.stop,
        outcome.visited.len()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::{edge_file, edge_line};
    use crate::scan::{ScanOptions, EDGES};
    use tempfile::TempDir;

    fn ids(set: &KeySet) -> Vec<&str> {
        set.sorted().into_iter().map(NodeId::as_str).collect()
    }

    fn scenario(dir: &TempDir) -> Scanner {
        let path = edge_file(
            dir,
            &[("A", "rel1", "B"), ("B", "rel2", "C"), ("C", "rel3", "D"), ("X", "rel4", "Y")],
        );
        Scanner::new(path, EDGES, ScanOptions::default())
    }

    #[test]
    fn test_two_hops_scenario() {
        let dir = TempDir::new().unwrap();
        let scanner = scenario(&dir);
        let outcome = discover(&scanner, &NodeId::new("A"), 2, &CancelFlag::new()).unwrap();

        assert_eq!(ids(&outcome.visited), vec!["A", "B", "C"]);
        assert_eq!(outcome.hops.len(), 2);
        assert_eq!(outcome.stop, StopReason::HopLimit);
        assert_eq!(outcome.hops[1].newly_found, 1);
    }

    #[test]
    fn test_zero_hops_keeps_only_seed() {
        let dir = TempDir::new().unwrap();
        let scanner = scenario(&dir);
        let outcome = discover(&scanner, &NodeId::new("a"), 0, &CancelFlag::new()).unwrap();
        assert_eq!(ids(&outcome.visited), vec!["A"]);
        assert!(outcome.hops.is_empty());
    }

    #[test]
    fn test_stops_early_when_frontier_exhausted() {
        let dir = TempDir::new().unwrap();
        let scanner = scenario(&dir);
        let outcome = discover(&scanner, &NodeId::new("A"), 10, &CancelFlag::new()).unwrap();

        assert_eq!(ids(&outcome.visited), vec!["A", "B", "C", "D"]);
        assert_eq!(outcome.stop, StopReason::FrontierExhausted);
        // hop 4 scans from {D} and finds nothing new; hop 5 never runs.
        assert_eq!(outcome.hops.len(), 4);
        assert_eq!(outcome.hops[3].newly_found, 0);
    }

    #[test]
    fn test_unknown_seed_finds_nothing() {
        let dir = TempDir::new().unwrap();
        let scanner = scenario(&dir);
        let outcome = discover(&scanner, &NodeId::new("Q"), 3, &CancelFlag::new()).unwrap();
        assert_eq!(ids(&outcome.visited), vec!["Q"]);
        assert_eq!(outcome.hops.len(), 1);
    }

    #[test]
    fn test_edges_are_undirected_and_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let path = edge_file(&dir, &[("b", "RO", "a"), (" c ", "RO", "B")]);
        let scanner = Scanner::new(path, EDGES, ScanOptions::default());
        let outcome = discover(&scanner, &NodeId::new("A"), 2, &CancelFlag::new()).unwrap();
        assert_eq!(ids(&outcome.visited), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_empty_endpoint_never_enters_visited() {
        let dir = TempDir::new().unwrap();
        let path = edge_file(&dir, &[("A", "RO", ""), ("A", "RO", "B")]);
        let scanner = Scanner::new(path, EDGES, ScanOptions::default());
        let outcome = discover(&scanner, &NodeId::new("A"), 1, &CancelFlag::new()).unwrap();
        assert_eq!(ids(&outcome.visited), vec!["A", "B"]);
    }

    #[test]
    fn test_monotonic_and_frontier_disjoint() {
        let dir = TempDir::new().unwrap();
        let path = edge_file(
            &dir,
            &[
                ("A", "r", "B"),
                ("B", "r", "A"),
                ("B", "r", "C"),
                ("C", "r", "A"),
                ("C", "r", "D"),
                ("D", "r", "E"),
                ("E", "r", "B"),
            ],
        );
        let scanner = Scanner::new(path, EDGES, ScanOptions::default().with_chunk_size(2));
        let cancel = CancelFlag::new();
        let mut discovery = Discovery::new(&scanner, NodeId::new("A"), 5).unwrap();

        let mut previous = discovery.state().visited().clone();
        loop {
            let state = discovery.state();
            let older = state.visited().difference(state.frontier());
            assert!(state.frontier().is_disjoint(&older));
            assert!(state.frontier().is_subset(state.visited()));

            if discovery.step(&cancel).unwrap().is_none() {
                break;
            }
            let visited = discovery.state().visited().clone();
            assert!(previous.is_subset(&visited));
            previous = visited;
        }
        assert!(discovery.state().hops_completed() <= 5);
    }

    #[test]
    fn test_chunk_size_invariance() {
        let dir = TempDir::new().unwrap();
        let rows: Vec<(String, String)> = (0..40)
            .map(|i| (format!("N{}", i), format!("N{}", (i * 7 + 3) % 40)))
            .collect();
        let triples: Vec<(&str, &str, &str)> =
            rows.iter().map(|(a, b)| (a.as_str(), "r", b.as_str())).collect();
        let path = edge_file(&dir, &triples);

        let run = |chunk_size: usize| {
            let scanner = Scanner::new(&path, EDGES, ScanOptions::default().with_chunk_size(chunk_size));
            discover(&scanner, &NodeId::new("N0"), 3, &CancelFlag::new())
                .unwrap()
                .visited
        };
        let full = run(triples.len());
        assert_eq!(run(1), full);
        assert_eq!(run(7), full);
    }

    #[test]
    fn test_cancellation_reports_hop() {
        let dir = TempDir::new().unwrap();
        let scanner = scenario(&dir);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = discover(&scanner, &NodeId::new("A"), 2, &cancel).unwrap_err();
        assert!(err.to_string().contains("discovery hop 1"));
    }

    #[test]
    fn test_empty_seed_rejected() {
        let dir = TempDir::new().unwrap();
        let scanner = scenario(&dir);
        assert!(Discovery::new(&scanner, NodeId::new("  "), 2).is_err());
    }

    #[test]
    fn test_row_format_helper() {
        assert_eq!(edge_line("a", "RO", "b").split('|').count(), 17);
    }
}
