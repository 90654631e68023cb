//! One-hop filter: rows touching the seed, plus (optionally) their attributes.

use anyhow::{Context, Result};
use clap::Parser;
use kgextract::dedup::dedup_records;
use kgextract::output::RowWriter;
use kgextract::scan::{ScanOptions, EDGES};
use kgextract::{direct_neighbors, CancelFlag, Config, NodeId, Pipeline, Scanner};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "neighbors")]
#[command(about = "Keep only the relation rows directly connected to the seed")]
struct Args {
    /// Config file (defaults to $KGEXTRACT_CONFIG, then ./kgextract.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed identifier (overrides discovery.seed)
    #[arg(short, long)]
    seed: Option<String>,

    /// Collapse identical rows before writing (needs dedup.max_rows headroom)
    #[arg(long)]
    dedup: bool,

    /// Also project the configured attribute files onto seed + neighbors
    #[arg(long)]
    project: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", "info"),
    )
    .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };
    if let Some(seed) = args.seed {
        config.discovery.seed = seed;
        config.validate()?;
    }

    let seed = NodeId::new(&config.discovery.seed);
    let options: ScanOptions = config.scan_options();
    let scanner = Scanner::new(&config.sources.edges, EDGES, options);
    let cancel = CancelFlag::new();
    cancel.cancel_on_ctrl_c();

    log::info!("Reading {} in chunks...", config.sources.edges.display());
    let task_cancel = cancel.clone();
    let task_seed = seed.clone();
    let hood = tokio::task::spawn_blocking(move || direct_neighbors(&scanner, &task_seed, &task_cancel))
        .await
        .context("neighbor scan panicked")??;

    let rows = if args.dedup || config.dedup.enabled {
        dedup_records(hood.rows, config.dedup.max_rows)?
    } else {
        hood.rows
    };

    std::fs::create_dir_all(&config.output.dir)
        .with_context(|| format!("Failed to create {}", config.output.dir.display()))?;
    let output = config.output_path(&config.output.neighbors_file);
    let mut sink = RowWriter::create(&output, &EDGES, config.scan.delimiter)?;
    for row in &rows {
        sink.write_record(row)?;
    }
    sink.finish()?;
    log::info!("Wrote {} lines to {}", rows.len(), output.display());

    let mut sample: Vec<&str> = hood.neighbors.iter().map(NodeId::as_str).collect();
    sample.sort_unstable();
    sample.truncate(10);
    log::info!("Found {} neighbors of {}. Sample: {:?}", hood.neighbors.len(), seed, sample);

    if args.project {
        let mut nodes = hood.neighbors;
        nodes.insert(seed);
        let pipeline = Pipeline::from_config(&config)?;
        let passes = tokio::task::spawn_blocking(move || pipeline.project_nodes(&nodes, &cancel))
            .await
            .context("projection task panicked")??;
        for pass in passes {
            log::info!("  {}: {} rows kept", pass.name, pass.rows_kept);
        }
    }

    Ok(())
}
