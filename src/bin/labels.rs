//! Re-run the attribute projections for a node list written by an earlier run.

use anyhow::{Context, Result};
use clap::Parser;
use kgextract::output::read_node_list;
use kgextract::{CancelFlag, Config, Pipeline};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "labels")]
#[command(about = "Filter concept and semantic type files down to a saved node list")]
struct Args {
    /// Config file (defaults to $KGEXTRACT_CONFIG, then ./kgextract.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node list, one identifier per line (defaults to output.dir/output.nodes_file)
    #[arg(short, long)]
    nodes: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", "info"),
    )
    .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };

    let nodes_path = args
        .nodes
        .unwrap_or_else(|| config.output_path(&config.output.nodes_file));
    let nodes = read_node_list(&nodes_path)?;
    log::info!("Loaded {} nodes from {}", nodes.len(), nodes_path.display());

    let pipeline = Pipeline::from_config(&config)?;
    if pipeline.projections.is_empty() {
        log::warn!("No projections configured and no concept/semantic type sources set.");
        return Ok(());
    }

    let cancel = CancelFlag::new();
    cancel.cancel_on_ctrl_c();
    let passes = tokio::task::spawn_blocking(move || pipeline.project_nodes(&nodes, &cancel))
        .await
        .context("projection task panicked")??;

    for pass in passes {
        log::info!("  {}: {} rows kept ({} chunks)", pass.name, pass.rows_kept, pass.scan.chunks);
    }
    Ok(())
}
