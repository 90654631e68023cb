use anyhow::{Context, Result};
use clap::Parser;
use kgextract::{CancelFlag, Config, Pipeline};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kgextract")]
#[command(about = "Extract the n-hop subgraph around a seed concept from pipe-delimited relation files")]
struct Args {
    /// Config file (defaults to $KGEXTRACT_CONFIG, then ./kgextract.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed identifier (overrides discovery.seed)
    #[arg(short, long)]
    seed: Option<String>,

    /// Hop limit (overrides discovery.max_hops)
    #[arg(long)]
    max_hops: Option<usize>,

    /// Rows per chunk (overrides scan.chunk_size)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Chunks read ahead on a background thread (overrides scan.prefetch_chunks)
    #[arg(long)]
    prefetch: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    log::info!("Starting kgextract v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };
    if let Some(seed) = args.seed {
        config.discovery.seed = seed;
    }
    if let Some(max_hops) = args.max_hops {
        config.discovery.max_hops = max_hops;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.scan.chunk_size = chunk_size;
    }
    if let Some(prefetch) = args.prefetch {
        config.scan.prefetch_chunks = prefetch;
    }
    config.validate()?;

    log::info!("Edges: {}", config.sources.edges.display());
    log::info!("Output dir: {}", config.output.dir.display());

    let pipeline = Pipeline::from_config(&config)?;
    let cancel = CancelFlag::new();
    cancel.cancel_on_ctrl_c();

    let report = tokio::task::spawn_blocking(move || pipeline.run(&cancel))
        .await
        .context("pipeline task panicked")??;

    log::info!("=== Extraction Complete ===");
    log::info!("Seed: {} ({:?} after {} hop(s))", report.seed, report.stop, report.hops.len());
    log::info!("Nodes: {}", report.node_count);
    for pass in &report.passes {
        log::info!("  {}: {} rows kept", pass.name, pass.rows_kept);
    }
    if report.skipped_malformed > 0 {
        log::warn!("Skipped {} malformed line(s). Check logs above for details.", report.skipped_malformed);
    }
    log::info!("Time: {:?}", report.finished_at - report.started_at);

    Ok(())
}
