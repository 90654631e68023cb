//! Fixed column layouts of the pipe-delimited source files.

use crate::error::{KgError, Result};

/// A named, fixed-arity column layout.
///
/// `keys` lists the column indices that hold identifiers; the scanner
/// normalizes those (trim + uppercase) and leaves every other field raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub keys: &'static [usize],
}

/// Relation rows (MRREL): two endpoints, relation code and label, provenance.
pub const EDGES: Schema = Schema {
    name: "edges",
    columns: &[
        "CUI1", "AUI1", "STYPE1", "REL", "CUI2", "AUI2", "STYPE2", "RELA", "RUI", "SRUI",
        "SAB", "SL", "RG", "DIR", "SUPPRESS", "CVF",
    ],
    keys: &[0, 4],
};

/// Concept name rows (MRCONSO).
pub const CONCEPTS: Schema = Schema {
    name: "concepts",
    columns: &[
        "CUI", "LAT", "TS", "LUI", "STT", "SUI", "ISPREF", "AUI", "SAUI", "SCUI", "SDUI",
        "SAB", "TTY", "CODE", "STR", "SRL", "SUPPRESS", "CVF",
    ],
    keys: &[0],
};

/// Semantic type rows (MRSTY).
pub const SEMANTIC_TYPES: Schema = Schema {
    name: "semantic_types",
    columns: &["CUI", "TUI", "STN", "STY", "ATUI", "CVF"],
    keys: &[0],
};

/// Column positions of the edge endpoints and relation labels.
pub const EDGE_SOURCE: usize = 0;
pub const EDGE_REL: usize = 3;
pub const EDGE_TARGET: usize = 4;
pub const EDGE_RELA: usize = 7;

impl Schema {
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// Resolve a schema by its config name.
    pub fn by_name(name: &str) -> Result<Schema> {
        match name.trim().to_lowercase().as_str() {
            "edges" | "mrrel" => Ok(EDGES),
            "concepts" | "mrconso" => Ok(CONCEPTS),
            "semantic_types" | "mrsty" => Ok(SEMANTIC_TYPES),
            other => Err(KgError::Config(format!("unknown schema: {}", other))),
        }
    }

    /// Index of a column by (case-insensitive) name.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column.trim()))
            .ok_or_else(|| {
                KgError::Config(format!(
                    "schema {} has no column named {}",
                    self.name, column
                ))
            })
    }

    pub fn is_key(&self, index: usize) -> bool {
        self.keys.contains(&index)
    }

    /// Header line: column names joined by the delimiter.
    pub fn header(&self, delimiter: char) -> String {
        self.columns.join(&delimiter.to_string())
    }
}
