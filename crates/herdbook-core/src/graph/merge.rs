use std::collections::HashSet;

use super::model::{TreeEdge, TreeGraph};

/// Merges a freshly fetched deeper graph into a previous one.
///
/// - `nodes`: union, `fresh` wins on id collision
/// - `edges`: union by `(from, to, relation)`, previous edges first
/// - `depth`, `generated_at`: the larger of the two
/// - `counts`: recomputed
pub fn merge(previous: &TreeGraph, fresh: &TreeGraph) -> TreeGraph {
    let mut nodes = previous.nodes.clone();
    nodes.extend(fresh.nodes.iter().map(|(id, record)| (*id, record.clone())));

    let mut seen: HashSet<&TreeEdge> = HashSet::new();
    let edges: Vec<TreeEdge> = previous
        .edges
        .iter()
        .chain(&fresh.edges)
        .filter(|edge| seen.insert(*edge))
        .cloned()
        .collect();

    let mut merged = TreeGraph {
        root_id: previous.root_id.or(fresh.root_id),
        nodes,
        edges,
        depth: previous.depth.max(fresh.depth),
        counts: Default::default(),
        generated_at: previous.generated_at.max(fresh.generated_at),
        kind: fresh.kind.or(previous.kind),
    };
    merged.recount();
    merged
}
