//! Server-provided genealogy graphs.
//!
//! A [`TreeGraph`] is a flat node map plus an edge list. This module turns
//! it into parent/child lookups ([`GraphAdjacency`]), detects which way its
//! edges point ([`orientation`]) and merges graphs fetched at increasing
//! depth ([`merge()`]).

mod adjacency;
mod merge;
mod model;
pub mod orientation;

pub use adjacency::GraphAdjacency;
pub use merge::merge;
pub use model::{Direction, GraphCounts, TreeEdge, TreeGraph};
pub use orientation::{count_root_edges, is_inverted, RootEdgeCounts};
