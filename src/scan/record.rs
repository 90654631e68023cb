use std::borrow::Borrow;
use std::fmt;

use crate::scan::schema::Schema;

/// Normalized entity identifier: trimmed and uppercased.
///
/// Hash/Eq are those of the normalized string, so `NodeId` can be looked up
/// in a set by `&str` once the probe itself is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(raw: &str) -> Self {
        NodeId(normalize_key(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        NodeId::new(raw)
    }
}

pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// One parsed line. Key columns are already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    /// 1-based line number in the source file.
    pub line: u64,
    fields: Vec<String>,
}

impl Record {
    /// Split `text` on `delimiter` and map it onto `schema`.
    ///
    /// There is no quoting, so a field containing the delimiter shifts every
    /// later column; the arity check is the only place that can catch it.
    /// A single trailing empty field (RRF rows end with the delimiter) is
    /// dropped.
    pub fn parse(
        text: &str,
        line: u64,
        schema: &Schema,
        delimiter: char,
    ) -> std::result::Result<Record, String> {
        let mut fields: Vec<String> = text.split(delimiter).map(str::to_string).collect();

        if fields.len() == schema.arity() + 1 && fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }

        if fields.len() != schema.arity() {
            return Err(format!(
                "expected {} fields for {}, found {}",
                schema.arity(),
                schema.name,
                fields.len()
            ));
        }

        for &key in schema.keys {
            let normalized = normalize_key(&fields[key]);
            fields[key] = normalized;
        }

        Ok(Record { line, fields })
    }

    pub fn from_fields(line: u64, fields: Vec<String>) -> Self {
        Record { line, fields }
    }

    pub fn get(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Canonical content tuple, ignoring the line number.
    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    pub fn join(&self, delimiter: char) -> String {
        self.fields.join(&delimiter.to_string())
    }
}
