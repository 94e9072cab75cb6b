//! Tree building over an in-memory animal collection.
//!
//! Used when the full herd is already cached client-side; no network.

use std::collections::HashMap;

use crate::animal::{AnimalId, AnimalRecord};
use crate::graph::Direction;
use crate::levels::{build_tree_levels, GeneticTree, Relatives};

/// Id and child indexes over a borrowed collection.
pub struct LocalIndex<'a> {
    collection: &'a [AnimalRecord],
    by_id: HashMap<AnimalId, usize>,
    children: HashMap<AnimalId, Vec<usize>>,
}

impl<'a> LocalIndex<'a> {
    /// Indexes `collection`. On duplicate ids the first record wins.
    pub fn new(collection: &'a [AnimalRecord]) -> Self {
        let mut by_id = HashMap::with_capacity(collection.len());
        let mut children: HashMap<AnimalId, Vec<usize>> = HashMap::new();

        for (index, record) in collection.iter().enumerate() {
            by_id.entry(record.id()).or_insert(index);

            let parents = record.parents();
            if let Some(father) = parents.father {
                children.entry(father).or_default().push(index);
            }
            if let Some(mother) = parents.mother.filter(|m| Some(*m) != parents.father) {
                children.entry(mother).or_default().push(index);
            }
        }

        Self {
            collection,
            by_id,
            children,
        }
    }

    pub fn get(&self, id: AnimalId) -> Option<&'a AnimalRecord> {
        self.by_id.get(&id).map(|&index| &self.collection[index])
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    /// Builds the tree rooted at `root_id`.
    ///
    /// Returns [`GeneticTree::empty`] when `root_id` is `None` or not in the
    /// collection, so the caller can fall back to the server.
    pub fn build(
        &self,
        root_id: Option<AnimalId>,
        direction: Direction,
        max_depth: usize,
        check_sex: bool,
    ) -> GeneticTree {
        let Some(root) = root_id.and_then(|id| self.get(id)) else {
            return GeneticTree::empty();
        };

        GeneticTree {
            animal: Some(root.clone()),
            levels: build_tree_levels(root, self, direction, max_depth, check_sex),
        }
    }
}

impl Relatives for LocalIndex<'_> {
    /// Embedded parent records win over collection lookups.
    fn parents(&self, animal: &AnimalRecord) -> Vec<AnimalRecord> {
        let parents = animal.parents();
        let father = animal
            .embedded_father()
            .or_else(|| parents.father.and_then(|id| self.get(id)));
        let mother = animal
            .embedded_mother()
            .or_else(|| parents.mother.and_then(|id| self.get(id)));

        father.into_iter().chain(mother).cloned().collect()
    }

    fn children(&self, animal: &AnimalRecord) -> Vec<AnimalRecord> {
        self.children
            .get(&animal.id())
            .map(|indexes| indexes.iter().map(|&i| self.collection[i].clone()).collect())
            .unwrap_or_default()
    }
}

/// One-shot local build with the historical sex check on ancestors.
pub fn build_local_tree(
    root_id: Option<AnimalId>,
    collection: &[AnimalRecord],
    direction: Direction,
    max_depth: usize,
) -> GeneticTree {
    LocalIndex::new(collection).build(root_id, direction, max_depth, true)
}
