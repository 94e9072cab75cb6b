//! Generational level construction.
//!
//! One breadth-first routine serves both data sources. The local collection
//! and the normalized server graph only differ in how they answer
//! [`Relatives`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::animal::{AnimalRecord, Sex};
use crate::graph::Direction;

pub use crate::config::DEFAULT_FALLBACK_DEPTH;

/// One generation, deduplicated by id.
pub type Level = Vec<AnimalRecord>;

/// Lookup of an animal's direct relatives.
pub trait Relatives {
    /// Known parents of `animal`, father first.
    fn parents(&self, animal: &AnimalRecord) -> Vec<AnimalRecord>;

    /// Known children of `animal`.
    fn children(&self, animal: &AnimalRecord) -> Vec<AnimalRecord>;

    /// One hop in `direction`.
    fn related(&self, animal: &AnimalRecord, direction: Direction) -> Vec<AnimalRecord> {
        match direction {
            Direction::Ancestors => self.parents(animal),
            Direction::Descendants => self.children(animal),
        }
    }
}

/// Where a tree's relationship data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeOrigin {
    Local,
    Remote,
}

/// When to drop a parent whose recorded sex contradicts its role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SexConsistency {
    /// Only for trees built from the local collection.
    #[default]
    LocalOnly,
    Always,
    Never,
}

impl SexConsistency {
    pub fn applies_to(&self, origin: TreeOrigin) -> bool {
        match self {
            SexConsistency::LocalOnly => origin == TreeOrigin::Local,
            SexConsistency::Always => true,
            SexConsistency::Never => false,
        }
    }
}

/// Whether `parent` may stand as a parent of `child`.
///
/// A father recorded as `Hembra` or a mother recorded as `Macho` is
/// rejected. A parent whose role the child does not name is accepted.
pub fn is_sex_consistent(child: &AnimalRecord, parent: &AnimalRecord) -> bool {
    let parents = child.parents();
    let id = parent.id();
    if parents.is_father(id) && parent.sex() == Sex::Hembra {
        return false;
    }
    if parents.is_mother(id) && parent.sex() == Sex::Macho {
        return false;
    }
    true
}

/// Result of building a tree: the root and its generations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneticTree {
    pub animal: Option<AnimalRecord>,
    pub levels: Vec<Level>,
}

impl GeneticTree {
    /// The not-found result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when nothing beyond the root is known.
    pub fn has_no_relatives(&self) -> bool {
        self.levels.len() <= 1
    }
}

/// Breadth-first expansion from `root`.
///
/// Level 0 is `[root]`. Each following level is the union of `related`
/// over the previous one, deduplicated by id. Stops before an empty level
/// or after `max_depth` expansions. An animal may reappear in a later
/// level when the data re-converges; only within-level duplicates are
/// removed.
pub fn build_levels<F>(root: &AnimalRecord, max_depth: usize, mut related: F) -> Vec<Level>
where
    F: FnMut(&AnimalRecord) -> Vec<AnimalRecord>,
{
    let mut levels: Vec<Level> = vec![vec![root.clone()]];

    while levels.len() <= max_depth {
        let Some(current) = levels.last() else {
            break;
        };

        let mut seen = HashSet::new();
        let next: Level = current
            .iter()
            .flat_map(|animal| related(animal))
            .filter(|candidate| seen.insert(candidate.id()))
            .collect();

        if next.is_empty() {
            break;
        }
        levels.push(next);
    }

    levels
}

/// Builds levels over any [`Relatives`] source, optionally applying the
/// sex-consistency check to each parent hop.
pub fn build_tree_levels<R>(
    root: &AnimalRecord,
    relatives: &R,
    direction: Direction,
    max_depth: usize,
    check_sex: bool,
) -> Vec<Level>
where
    R: Relatives + ?Sized,
{
    build_levels(root, max_depth, |animal| {
        let mut related = relatives.related(animal, direction);
        if check_sex && direction == Direction::Ancestors {
            related.retain(|parent| is_sex_consistent(animal, parent));
        }
        related
    })
}

/// Maximum depth for a graph that declares `declared` generations.
pub fn effective_depth(declared: i64, fallback: usize) -> usize {
    if declared <= 0 {
        fallback
    } else {
        usize::try_from(declared).unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Parents by id; children derived from the same map.
    struct MapRelatives(HashMap<u64, AnimalRecord>);

    impl MapRelatives {
        fn new(records: Vec<AnimalRecord>) -> Self {
            Self(records.into_iter().map(|r| (r.id(), r)).collect())
        }
    }

    impl Relatives for MapRelatives {
        fn parents(&self, animal: &AnimalRecord) -> Vec<AnimalRecord> {
            animal
                .parents()
                .iter()
                .filter_map(|id| self.0.get(&id).cloned())
                .collect()
        }

        fn children(&self, animal: &AnimalRecord) -> Vec<AnimalRecord> {
            let mut children: Vec<AnimalRecord> = self
                .0
                .values()
                .filter(|r| r.parents().contains(animal.id()))
                .cloned()
                .collect();
            children.sort_by_key(|r| r.id());
            children
        }
    }

    #[test]
    fn test_root_only() {
        let root = AnimalRecord::new(1);
        let levels = build_levels(&root, 5, |_| Vec::new());
        assert_eq!(levels, vec![vec![root]]);
    }

    #[test]
    fn test_zero_depth() {
        let root = AnimalRecord::new(1).with_father(2);
        let relatives = MapRelatives::new(vec![root.clone(), AnimalRecord::new(2)]);
        let levels = build_tree_levels(&root, &relatives, Direction::Ancestors, 0, false);
        assert_eq!(levels.len(), 1);
    }

    #[test]
    fn test_cycle_is_bounded() {
        let a = AnimalRecord::new(1).with_father(2);
        let b = AnimalRecord::new(2).with_father(1);
        let relatives = MapRelatives::new(vec![a.clone(), b]);

        let levels = build_tree_levels(&a, &relatives, Direction::Ancestors, 4, false);
        assert_eq!(levels.len(), 5);
        let ids: Vec<u64> = levels.iter().map(|l| l[0].id()).collect();
        assert_eq!(ids, vec![1, 2, 1, 2, 1]);
    }

    #[test]
    fn test_dedup_within_level() {
        // 1 and 2 share both parents.
        let root = AnimalRecord::new(9).with_father(1).with_mother(2);
        let records = vec![
            root.clone(),
            AnimalRecord::new(1).with_father(3).with_mother(4),
            AnimalRecord::new(2).with_father(3).with_mother(4),
            AnimalRecord::new(3),
            AnimalRecord::new(4),
        ];
        let relatives = MapRelatives::new(records);

        let levels = build_tree_levels(&root, &relatives, Direction::Ancestors, 10, false);
        assert_eq!(levels.len(), 3);
        let grandparents: Vec<u64> = levels[2].iter().map(|r| r.id()).collect();
        assert_eq!(grandparents, vec![3, 4]);
    }

    #[test]
    fn test_sex_consistency() {
        let root = AnimalRecord::new(5).with_father(2).with_mother(3);
        let records = vec![
            root.clone(),
            AnimalRecord::new(2).with_sex(Sex::Hembra),
            AnimalRecord::new(3).with_sex(Sex::Hembra),
        ];
        let relatives = MapRelatives::new(records);

        let checked = build_tree_levels(&root, &relatives, Direction::Ancestors, 3, true);
        let ids: Vec<u64> = checked[1].iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![3]);

        let unchecked = build_tree_levels(&root, &relatives, Direction::Ancestors, 3, false);
        assert_eq!(unchecked[1].len(), 2);
    }

    #[test]
    fn test_descendants() {
        let root = AnimalRecord::new(1);
        let records = vec![
            root.clone(),
            AnimalRecord::new(2).with_father(1),
            AnimalRecord::new(3).with_mother(1),
            AnimalRecord::new(4).with_father(2),
        ];
        let relatives = MapRelatives::new(records);

        let levels = build_tree_levels(&root, &relatives, Direction::Descendants, 10, true);
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[1].len(), 2);
        assert_eq!(levels[2][0].id(), 4);
    }

    #[test]
    fn test_effective_depth() {
        assert_eq!(effective_depth(0, DEFAULT_FALLBACK_DEPTH), 10);
        assert_eq!(effective_depth(-3, 7), 7);
        assert_eq!(effective_depth(4, 10), 4);
    }

    #[test]
    fn test_sex_consistency_policy() {
        assert!(SexConsistency::LocalOnly.applies_to(TreeOrigin::Local));
        assert!(!SexConsistency::LocalOnly.applies_to(TreeOrigin::Remote));
        assert!(SexConsistency::Always.applies_to(TreeOrigin::Remote));
        assert!(!SexConsistency::Never.applies_to(TreeOrigin::Local));
    }
}
