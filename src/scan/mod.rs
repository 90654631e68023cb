//! Bounded-memory scanning of pipe-delimited source files.
//!
//! Schemas describe the fixed column layouts, the scanner turns a file into
//! ordered chunks of records, and key sets test records for membership.

pub mod keyset;
pub mod record;
pub mod scanner;
pub mod schema;

pub use keyset::{Combinator, KeyMatcher, KeySet};
pub use record::{normalize_key, NodeId, Record};
pub use scanner::{Chunk, ChunkIter, MalformedPolicy, ScanOptions, ScanStats, Scanner, DEFAULT_CHUNK_SIZE};
pub use schema::{Schema, CONCEPTS, EDGES, SEMANTIC_TYPES};
