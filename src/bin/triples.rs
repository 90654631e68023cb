//! Turn a materialized edge file into (subject, relation, object) triples.

use anyhow::{Context, Result};
use clap::Parser;
use kgextract::dictionary::ConceptDictionary;
use kgextract::scan::{ScanOptions, CONCEPTS, EDGES, SEMANTIC_TYPES};
use kgextract::triples::extract_triples;
use kgextract::{CancelFlag, Config, Scanner};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "triples")]
#[command(about = "Extract triples from the extracted subgraph and resolve concept names")]
struct Args {
    /// Config file (defaults to $KGEXTRACT_CONFIG, then ./kgextract.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Edge file with header (defaults to output.dir/output.edges_file)
    #[arg(short, long)]
    edges: Option<PathBuf>,

    /// Projected concept file with header (defaults to the configured concepts projection output)
    #[arg(long)]
    concepts: Option<PathBuf>,

    /// Projected semantic type file with header (defaults to the configured semantic types projection output)
    #[arg(long)]
    semantic_types: Option<PathBuf>,

    /// How many triples to print
    #[arg(long, default_value = "10")]
    sample: usize,
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
    let options = ScanOptions {
        has_header: true,
        ..config.scan_options()
    };

    let edges_path = args
        .edges
        .unwrap_or_else(|| config.output_path(&config.output.edges_file));
    let cancel = CancelFlag::new();
    cancel.cancel_on_ctrl_c();

    let dictionary_inputs = match (args.concepts, args.semantic_types) {
        (Some(conso), Some(sty)) => Some((conso, sty)),
        (None, None) => {
            // Fall back to the projection outputs of an earlier run.
            match (config.projection_output(&CONCEPTS), config.projection_output(&SEMANTIC_TYPES)) {
                (Some(conso), Some(sty)) if conso.is_file() && sty.is_file() => Some((conso, sty)),
                _ => None,
            }
        }
        _ => anyhow::bail!("--concepts and --semantic-types must be given together"),
    };
    if dictionary_inputs.is_none() {
        log::info!("No concept files found, printing raw identifiers.");
    }

    let (triples, dictionary) = tokio::task::spawn_blocking(move || {
        let triples = extract_triples(&Scanner::new(&edges_path, EDGES, options.clone()), &cancel)?;
        let dictionary = match dictionary_inputs {
            Some((conso, sty)) => ConceptDictionary::build(
                &Scanner::new(conso, CONCEPTS, options.clone()),
                &Scanner::new(sty, SEMANTIC_TYPES, options),
                &cancel,
            )?,
            None => ConceptDictionary::default(),
        };
        Ok::<_, kgextract::KgError>((triples, dictionary))
    })
    .await
    .context("triple extraction panicked")??;

    println!("Extracted {} triples.", triples.len());
    for triple in triples.iter().take(args.sample) {
        println!(
            "({} [{}], {}, {} [{}])",
            dictionary.label(&triple.subject),
            dictionary.semantic_types(&triple.subject).join(", "),
            triple.relation,
            dictionary.label(&triple.object),
            dictionary.semantic_types(&triple.object).join(", "),
        );
    }

    Ok(())
}
