//! End-to-end run: discover → finalize node set → materialize → project.
//!
//! Each step is one or more full scans; the node set produced by discovery
//! is the only thing handed to the later passes. A failure stops the run and
//! reports the last stage that finished.

mod stage;

pub use stage::{PipelineFailure, Stage};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cancel::CancelFlag;
use crate::config::{Config, ProjectionConfig};
use crate::error::{KgError, Result};
use crate::graph::{materialize, Discovery, HopReport, StopReason};
use crate::output::{file_digest, write_node_list, PassReport, RowWriter};
use crate::project::{project, FieldEquals, RowPredicate};
use crate::scan::{KeySet, NodeId, ScanOptions, Scanner, Schema, EDGES};
use stage::StageTracker;

/// A resolved attribute projection.
#[derive(Debug, Clone)]
pub struct ProjectionPlan {
    pub name: String,
    pub source: PathBuf,
    pub schema: Schema,
    pub key_column: usize,
    pub filter: Option<FieldEquals>,
    pub output: PathBuf,
}

impl ProjectionPlan {
    pub fn from_config(config: &ProjectionConfig, output_dir: &Path) -> Result<Self> {
        let schema = Schema::by_name(&config.schema)?;
        let key_column = schema.column_index(&config.key_column)?;
        let filter = config
            .filter
            .as_ref()
            .map(|f| FieldEquals::new(&schema, &f.column, &f.value))
            .transpose()?;
        Ok(Self {
            name: config.name.clone(),
            source: config.source.clone(),
            schema,
            key_column,
            filter,
            output: output_dir.join(&config.output),
        })
    }
}

/// SHA-256 of one output file.
#[derive(Debug, Clone, Serialize)]
pub struct OutputDigest {
    pub path: PathBuf,
    pub sha256: String,
}

/// Summary of a completed run, written as JSON next to the outputs.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub seed: String,
    pub max_hops: usize,
    pub chunk_size: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stop: StopReason,
    pub hops: Vec<HopReport>,
    pub node_count: usize,
    pub passes: Vec<PassReport>,
    pub skipped_malformed: u64,
    pub outputs: Vec<OutputDigest>,
}

impl RunReport {
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| KgError::io(path, e))
    }
}

/// Everything a run needs, resolved from config.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub edges: PathBuf,
    pub seed: NodeId,
    pub max_hops: usize,
    pub scan: ScanOptions,
    pub output_dir: PathBuf,
    pub edges_output: PathBuf,
    pub nodes_output: PathBuf,
    pub report_output: PathBuf,
    pub projections: Vec<ProjectionPlan>,
}

impl Pipeline {
    pub fn from_config(config: &Config) -> Result<Self> {
        let seed = NodeId::new(&config.discovery.seed);
        if seed.is_empty() {
            return Err(KgError::Config("discovery.seed must not be empty".to_string()));
        }
        let projections = config
            .projections()
            .iter()
            .map(|p| ProjectionPlan::from_config(p, &config.output.dir))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            edges: config.sources.edges.clone(),
            seed,
            max_hops: config.discovery.max_hops,
            scan: config.scan_options(),
            output_dir: config.output.dir.clone(),
            edges_output: config.output_path(&config.output.edges_file),
            nodes_output: config.output_path(&config.output.nodes_file),
            report_output: config.output_path(&config.output.report_file),
            projections,
        })
    }

    fn edge_scanner(&self) -> Scanner {
        Scanner::new(&self.edges, EDGES, self.scan.clone())
    }

    /// Run every stage, then write the JSON report.
    pub fn run(&self, cancel: &CancelFlag) -> std::result::Result<RunReport, PipelineFailure> {
        let started_at = Utc::now();
        let mut tracker = StageTracker::new();

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| tracker.fail(KgError::io(&self.output_dir, e)))?;

        log::info!(
            "Starting {}-hop discovery from {} over {}",
            self.max_hops,
            self.seed,
            self.edges.display()
        );
        let edges = self.edge_scanner();
        let mut discovery =
            Discovery::new(&edges, self.seed.clone(), self.max_hops).map_err(|e| tracker.fail(e))?;
        while let Some(hop) = discovery.next_hop() {
            tracker.enter(Stage::Discovering { hop });
            discovery.step(cancel).map_err(|e| tracker.fail(e))?;
            tracker.complete();
        }
        let outcome = discovery.finish();

        tracker.enter(Stage::NodeSetFinalized);
        let nodes = outcome.visited;
        let node_count = write_node_list(&self.nodes_output, &nodes).map_err(|e| tracker.fail(e))?;
        log::info!(
            "BFS node-only done, total nodes={}, node list -> {}",
            node_count,
            self.nodes_output.display()
        );
        tracker.complete();

        tracker.enter(Stage::Materializing);
        let edge_pass = self
            .materialize_edges(&edges, &nodes, cancel)
            .map_err(|e| tracker.fail(e))?;
        tracker.complete();

        let mut passes = vec![edge_pass];
        passes.extend(self.run_projections(&nodes, cancel, &mut tracker)?);

        tracker.enter(Stage::Complete);
        let mut outputs = Vec::new();
        for path in self.output_files() {
            let sha256 = file_digest(&path).map_err(|e| tracker.fail(e))?;
            outputs.push(OutputDigest { path, sha256 });
        }

        let skipped_malformed = self.malformed_lines(&outcome.hops, &passes);
        if skipped_malformed > 0 {
            log::warn!("{} malformed line(s) skipped across all source files", skipped_malformed);
        }

        let report = RunReport {
            seed: self.seed.to_string(),
            max_hops: self.max_hops,
            chunk_size: self.scan.chunk_size,
            started_at,
            finished_at: Utc::now(),
            stop: outcome.stop,
            hops: outcome.hops,
            node_count,
            passes,
            skipped_malformed,
            outputs,
        };
        report.write(&self.report_output).map_err(|e| tracker.fail(e))?;
        tracker.complete();
        log::info!("Done. Report -> {}", self.report_output.display());
        Ok(report)
    }

    /// Projection passes only, for a node set that is already final
    /// (e.g. read back from a node list).
    pub fn project_nodes(
        &self,
        nodes: &KeySet,
        cancel: &CancelFlag,
    ) -> std::result::Result<Vec<PassReport>, PipelineFailure> {
        let mut tracker = StageTracker::new();
        tracker.enter(Stage::NodeSetFinalized);
        tracker.complete();
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| tracker.fail(KgError::io(&self.output_dir, e)))?;
        self.run_projections(nodes, cancel, &mut tracker)
    }

    fn materialize_edges(&self, edges: &Scanner, nodes: &KeySet, cancel: &CancelFlag) -> Result<PassReport> {
        let mut sink = RowWriter::create(&self.edges_output, &EDGES, self.scan.delimiter)?;
        let report = materialize(edges, nodes, &mut sink, cancel)?;
        sink.finish()?;
        log::info!("edges -> {}", self.edges_output.display());
        Ok(report)
    }

    fn run_projections(
        &self,
        nodes: &KeySet,
        cancel: &CancelFlag,
        tracker: &mut StageTracker,
    ) -> std::result::Result<Vec<PassReport>, PipelineFailure> {
        let mut passes = Vec::with_capacity(self.projections.len());
        for plan in &self.projections {
            tracker.enter(Stage::Projecting {
                name: plan.name.clone(),
            });
            let report = self.project_one(plan, nodes, cancel).map_err(|e| tracker.fail(e))?;
            tracker.complete();
            passes.push(report);
        }
        Ok(passes)
    }

    fn project_one(&self, plan: &ProjectionPlan, nodes: &KeySet, cancel: &CancelFlag) -> Result<PassReport> {
        let source = Scanner::new(&plan.source, plan.schema, self.scan.clone());
        let mut sink = RowWriter::create(&plan.output, &plan.schema, self.scan.delimiter)?;
        let predicate = plan.filter.as_ref().map(|f| f as &dyn RowPredicate);
        let report = project(&plan.name, &source, plan.key_column, nodes, predicate, &mut sink, cancel)?;
        sink.finish()?;
        log::info!("[{}] -> {}", plan.name, plan.output.display());
        Ok(report)
    }

    /// Distinct malformed lines across the source files.
    ///
    /// Every scan of a file meets the same bad lines, so each file counts
    /// once, at the highest figure any of its scans saw. `passes` is the edge
    /// pass followed by one pass per projection, in plan order.
    fn malformed_lines(&self, hops: &[HopReport], passes: &[PassReport]) -> u64 {
        let mut per_file: HashMap<&Path, u64> = HashMap::new();
        let edge_scans = hops
            .iter()
            .map(|h| h.skipped_malformed)
            .chain(passes.first().map(|p| p.scan.skipped_malformed));
        for skipped in edge_scans {
            let count = per_file.entry(self.edges.as_path()).or_default();
            *count = (*count).max(skipped);
        }
        for (plan, pass) in self.projections.iter().zip(passes.iter().skip(1)) {
            let count = per_file.entry(plan.source.as_path()).or_default();
            *count = (*count).max(pass.scan.skipped_malformed);
        }
        per_file.values().sum()
    }

    fn output_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.nodes_output.clone(), self.edges_output.clone()];
        files.extend(self.projections.iter().map(|p| p.output.clone()));
        files
    }
}
