//! Edge orientation detection.
//!
//! The naive reading of an edge is `from` = parent, `to` = child. Backend
//! versions disagree on this, so each graph is checked by counting the
//! edges that touch the root on either side and taking the majority.
//!
//! Ties resolve to "not inverted". A root with one edge on each side is
//! therefore read naively, whichever way the server meant it.

use super::model::{Direction, TreeEdge};
use crate::animal::AnimalId;

/// Edges touching the root, split by side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RootEdgeCounts {
    /// Edges whose `to` is the root.
    pub toward_root: usize,
    /// Edges whose `from` is the root.
    pub from_root: usize,
}

pub fn count_root_edges(edges: &[TreeEdge], root_id: AnimalId) -> RootEdgeCounts {
    edges.iter().fold(RootEdgeCounts::default(), |mut counts, edge| {
        if edge.to == root_id {
            counts.toward_root += 1;
        }
        if edge.from == root_id {
            counts.from_root += 1;
        }
        counts
    })
}

/// Whether the edge list encodes child -> parent instead of parent -> child.
///
/// In an ancestors graph the root is a child, so naive edges point toward
/// it; in a descendants graph the root is a parent, so naive edges leave it.
pub fn is_inverted(edges: &[TreeEdge], root_id: AnimalId, direction: Direction) -> bool {
    let counts = count_root_edges(edges, root_id);
    match direction {
        Direction::Ancestors => counts.from_root > counts.toward_root,
        Direction::Descendants => counts.toward_root > counts.from_root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naive_ancestors() {
        let edges = vec![TreeEdge::new(2, 5, "father"), TreeEdge::new(3, 5, "mother")];
        assert_eq!(
            count_root_edges(&edges, 5),
            RootEdgeCounts { toward_root: 2, from_root: 0 }
        );
        assert!(!is_inverted(&edges, 5, Direction::Ancestors));
    }

    #[test]
    fn test_inverted_ancestors() {
        let edges = vec![TreeEdge::new(5, 2, "father"), TreeEdge::new(5, 3, "mother")];
        assert!(is_inverted(&edges, 5, Direction::Ancestors));
    }

    #[test]
    fn test_descendants() {
        let naive = vec![TreeEdge::new(5, 8, "father"), TreeEdge::new(5, 9, "father")];
        assert!(!is_inverted(&naive, 5, Direction::Descendants));

        let inverted = vec![TreeEdge::new(8, 5, "father"), TreeEdge::new(9, 5, "father")];
        assert!(is_inverted(&inverted, 5, Direction::Descendants));
    }

    #[test]
    fn test_tie_is_not_inverted() {
        let edges = vec![TreeEdge::new(2, 5, "father"), TreeEdge::new(5, 3, "mother")];
        assert!(!is_inverted(&edges, 5, Direction::Ancestors));
        assert!(!is_inverted(&edges, 5, Direction::Descendants));
        assert!(!is_inverted(&[], 5, Direction::Ancestors));
    }
}
