use crate::error::Result;
use crate::scan::{Record, Schema};

/// Secondary row condition applied after the key-set test.
pub trait RowPredicate {
    fn holds(&self, record: &Record) -> bool;

    fn describe(&self) -> String {
        "custom predicate".to_string()
    }
}

impl<F> RowPredicate for F
where
    F: Fn(&Record) -> bool,
{
    fn holds(&self, record: &Record) -> bool {
        self(record)
    }
}

/// `column == value`, trimmed and ASCII case-insensitive (`LAT = ENG`).
#[derive(Debug, Clone)]
pub struct FieldEquals {
    column: usize,
    name: String,
    value: String,
}

impl FieldEquals {
    pub fn new(schema: &Schema, column: &str, value: &str) -> Result<Self> {
        let index = schema.column_index(column)?;
        Ok(Self {
            column: index,
            name: schema.columns[index].to_string(),
            value: value.trim().to_string(),
        })
    }
}

impl RowPredicate for FieldEquals {
    fn holds(&self, record: &Record) -> bool {
        record.get(self.column).trim().eq_ignore_ascii_case(&self.value)
    }

    fn describe(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}
