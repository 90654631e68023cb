//! Concept name and semantic type lookups built from projected attribute files.

use std::collections::HashMap;

use crate::cancel::CancelFlag;
use crate::error::Result;
use crate::scan::{NodeId, Scanner, CONCEPTS, SEMANTIC_TYPES};

const TS_PREFERRED: &str = "P";

#[derive(Debug, Clone, Default)]
pub struct ConceptDictionary {
    preferred_names: HashMap<NodeId, String>,
    semantic_types: HashMap<NodeId, Vec<String>>,
}

impl ConceptDictionary {
    /// Build from a concept file and a semantic-type file.
    ///
    /// The first `TS = P` name seen for a concept wins. Semantic types are
    /// kept distinct, in file order.
    pub fn build(concepts: &Scanner, semantic_types: &Scanner, cancel: &CancelFlag) -> Result<Self> {
        let ts = CONCEPTS.column_index("TS")?;
        let str_col = CONCEPTS.column_index("STR")?;
        let sty = SEMANTIC_TYPES.column_index("STY")?;

        let mut dict = ConceptDictionary::default();

        concepts.scan(cancel, "preferred names", |chunk| {
            for record in &chunk.records {
                if record.get(ts).trim() != TS_PREFERRED {
                    continue;
                }
                dict.preferred_names
                    .entry(NodeId::new(record.get(0)))
                    .or_insert_with(|| record.get(str_col).to_string());
            }
            Ok(())
        })?;

        semantic_types.scan(cancel, "semantic types", |chunk| {
            for record in &chunk.records {
                let label = record.get(sty).trim();
                if label.is_empty() {
                    continue;
                }
                let labels = dict.semantic_types.entry(NodeId::new(record.get(0))).or_default();
                if !labels.iter().any(|l| l == label) {
                    labels.push(label.to_string());
                }
            }
            Ok(())
        })?;

        log::info!(
            "Concept dictionary: {} preferred names, {} typed concepts",
            dict.preferred_names.len(),
            dict.semantic_types.len()
        );
        Ok(dict)
    }

    pub fn preferred_name(&self, cui: &str) -> Option<&str> {
        self.preferred_names
            .get(NodeId::new(cui).as_str())
            .map(String::as_str)
    }

    pub fn semantic_types(&self, cui: &str) -> &[String] {
        self.semantic_types
            .get(NodeId::new(cui).as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Preferred name, falling back to the identifier itself.
    pub fn label<'a>(&'a self, cui: &'a str) -> &'a str {
        self.preferred_name(cui).unwrap_or(cui)
    }

    pub fn len(&self) -> usize {
        self.preferred_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preferred_names.is_empty()
    }
}
