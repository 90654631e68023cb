pub mod cancel;
pub mod config;
pub mod dedup;
pub mod dictionary;
pub mod error;
pub mod graph;
pub mod output;
pub mod pipeline;
pub mod project;
pub mod scan;
pub mod triples;

pub use cancel::CancelFlag;
pub use config::Config;
pub use error::{KgError, Result};
pub use graph::{direct_neighbors, discover, materialize};
pub use pipeline::{Pipeline, PipelineFailure, RunReport, Stage};
pub use project::project;
pub use scan::{KeySet, NodeId, Scanner};
