//! Semantic triples from materialized edge rows.

use serde::Serialize;

use crate::cancel::CancelFlag;
use crate::error::{KgError, Result};
use crate::scan::schema::{EDGE_REL, EDGE_RELA, EDGE_SOURCE, EDGE_TARGET};
use crate::scan::{Record, Scanner, EDGES};

/// (subject, relation, object); relation is RELA when present, else REL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Triple {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl Triple {
    pub fn from_edge(record: &Record) -> Self {
        let rela = record.get(EDGE_RELA).trim();
        let relation = if rela.is_empty() {
            record.get(EDGE_REL).trim()
        } else {
            rela
        };
        Triple {
            subject: record.get(EDGE_SOURCE).to_string(),
            relation: relation.to_string(),
            object: record.get(EDGE_TARGET).to_string(),
        }
    }
}

/// Read every triple from an edge file (typically a materialized subgraph).
pub fn extract_triples(scanner: &Scanner, cancel: &CancelFlag) -> Result<Vec<Triple>> {
    if scanner.schema() != &EDGES {
        return Err(KgError::InvalidInput(format!(
            "triples need the edges schema, got {}",
            scanner.schema().name
        )));
    }
    let mut triples = Vec::new();
    scanner.scan(cancel, "triples", |chunk| {
        triples.extend(chunk.records.iter().map(Triple::from_edge));
        Ok(())
    })?;
    log::info!("Extracted {} triples from {}", triples.len(), scanner.path().display());
    Ok(triples)
}
