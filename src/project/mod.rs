//! Attribute projection: restrict auxiliary record files to a key set.

mod predicate;
mod projection;

pub use predicate::{FieldEquals, RowPredicate};
pub use projection::project;
