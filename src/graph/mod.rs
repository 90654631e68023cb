//! Subgraph extraction over the edge file.
//!
//! Discovery grows the node set hop by hop (a row matches if ANY endpoint is
//! in the frontier); materialization then keeps only rows whose endpoints are
//! ALL in the final node set. The direct-neighbor filter is the one-hop,
//! in-memory variant used for small neighborhoods.

mod discovery;
mod materialize;
mod neighbors;

pub use discovery::{
    discover, Discovery, DiscoveryOutcome, DiscoveryState, HopReport, StopReason,
};
pub use materialize::materialize;
pub use neighbors::{direct_neighbors, Neighborhood};
