use std::collections::HashMap;

use log::debug;

use super::model::{Direction, TreeGraph};
use super::orientation::is_inverted;
use crate::animal::{AnimalId, AnimalRecord};
use crate::levels::Relatives;

/// Parent and child lookups derived from a [`TreeGraph`].
#[derive(Debug, Clone, Default)]
pub struct GraphAdjacency {
    parents_of: HashMap<AnimalId, Vec<AnimalRecord>>,
    children_of: HashMap<AnimalId, Vec<AnimalRecord>>,
    inverted: bool,
}

impl GraphAdjacency {
    /// Normalizes a graph, reading its orientation against its own `type`
    /// (ancestors when absent).
    pub fn from_graph(graph: &TreeGraph) -> Self {
        Self::with_direction(graph, graph.kind.unwrap_or(Direction::Ancestors))
    }

    /// Normalizes a graph, reading its orientation against `direction`.
    ///
    /// Edges whose endpoints are missing from `graph.nodes` contribute
    /// nothing to the side that would need the missing record.
    pub fn with_direction(graph: &TreeGraph, direction: Direction) -> Self {
        let inverted = graph
            .root_id
            .map(|root| is_inverted(&graph.edges, root, direction))
            .unwrap_or(false);

        if inverted {
            debug!(
                "Reading {} graph for {:?} with inverted edges",
                direction, graph.root_id
            );
        }

        let mut adjacency = Self {
            inverted,
            ..Self::default()
        };
        let mut skipped = 0usize;

        for edge in &graph.edges {
            let (parent_id, child_id) = if inverted {
                (edge.to, edge.from)
            } else {
                (edge.from, edge.to)
            };

            match graph.nodes.get(&parent_id) {
                Some(parent) => push_unique(&mut adjacency.parents_of, child_id, parent),
                None => skipped += 1,
            }
            match graph.nodes.get(&child_id) {
                Some(child) => push_unique(&mut adjacency.children_of, parent_id, child),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!("Skipped {} edge endpoints missing from graph nodes", skipped);
        }

        adjacency
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn parents_of(&self, id: AnimalId) -> &[AnimalRecord] {
        self.parents_of.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children_of(&self, id: AnimalId) -> &[AnimalRecord] {
        self.children_of.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn push_unique(map: &mut HashMap<AnimalId, Vec<AnimalRecord>>, key: AnimalId, record: &AnimalRecord) {
    let entry = map.entry(key).or_default();
    if !entry.iter().any(|existing| existing.id() == record.id()) {
        entry.push(record.clone());
    }
}

impl Relatives for GraphAdjacency {
    fn parents(&self, animal: &AnimalRecord) -> Vec<AnimalRecord> {
        let mut parents = self.parents_of(animal.id()).to_vec();
        // Father first when the child names its parents.
        let known = animal.parents();
        parents.sort_by_key(|p| {
            if known.is_father(p.id()) {
                0
            } else if known.is_mother(p.id()) {
                1
            } else {
                2
            }
        });
        parents
    }

    fn children(&self, animal: &AnimalRecord) -> Vec<AnimalRecord> {
        self.children_of(animal.id()).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animal::Sex;

    fn scenario_graph() -> TreeGraph {
        TreeGraph::new(AnimalRecord::new(5).with_father(2).with_mother(3), Direction::Ancestors)
            .with_node(AnimalRecord::new(2).with_sex(Sex::Macho))
            .with_node(AnimalRecord::new(3).with_sex(Sex::Hembra))
            .with_edge(2, 5, "father")
            .with_edge(3, 5, "mother")
            .with_depth(1)
    }

    #[test]
    fn test_naive_graph() {
        let adjacency = GraphAdjacency::from_graph(&scenario_graph());
        assert!(!adjacency.is_inverted());

        let parents: Vec<u64> = adjacency.parents_of(5).iter().map(|r| r.id()).collect();
        assert_eq!(parents, vec![2, 3]);
        assert_eq!(adjacency.children_of(2)[0].id(), 5);
        assert!(adjacency.parents_of(2).is_empty());
    }

    #[test]
    fn test_inverted_graph() {
        let graph = TreeGraph::new(AnimalRecord::new(5), Direction::Ancestors)
            .with_node(AnimalRecord::new(2))
            .with_node(AnimalRecord::new(3))
            .with_edge(5, 2, "father")
            .with_edge(5, 3, "mother");

        let adjacency = GraphAdjacency::from_graph(&graph);
        assert!(adjacency.is_inverted());
        assert_eq!(adjacency.parents_of(5).len(), 2);
    }

    #[test]
    fn test_dangling_edges_skipped() {
        let graph = scenario_graph().with_edge(40, 2, "father");
        let adjacency = GraphAdjacency::from_graph(&graph);

        assert!(adjacency.parents_of(2).is_empty());
        assert_eq!(adjacency.children_of(40)[0].id(), 2);
    }

    #[test]
    fn test_parents_father_first() {
        let graph = TreeGraph::new(AnimalRecord::new(5).with_father(2).with_mother(3), Direction::Ancestors)
            .with_node(AnimalRecord::new(2))
            .with_node(AnimalRecord::new(3))
            .with_edge(3, 5, "mother")
            .with_edge(2, 5, "father");

        let adjacency = GraphAdjacency::from_graph(&graph);
        let root = graph.root().unwrap();
        let ids: Vec<u64> = adjacency.parents(root).iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
