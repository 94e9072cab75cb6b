//! Display-side processing of built levels: lineage filtering, sibling
//! ordering, parent role labels and generation names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::animal::{AnimalId, AnimalRecord};
use crate::graph::Direction;
use crate::levels::Level;

/// Which lines of a tree to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineageMode {
    /// Full bilateral tree.
    #[default]
    #[serde(rename = "ambos")]
    Both,
    /// Father, paternal grandfather, and so on.
    #[serde(rename = "paterna")]
    Paternal,
    /// Mother, maternal grandmother, and so on.
    #[serde(rename = "materna")]
    Maternal,
}

impl LineageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineageMode::Both => "ambos",
            LineageMode::Paternal => "paterna",
            LineageMode::Maternal => "materna",
        }
    }
}

impl fmt::Display for LineageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ambos" | "both" => Ok(LineageMode::Both),
            "paterna" | "paternal" => Ok(LineageMode::Paternal),
            "materna" | "maternal" => Ok(LineageMode::Maternal),
            other => Err(format!("unknown lineage mode: {}", other)),
        }
    }
}

/// Applies a lineage mode to built levels.
///
/// `Both` keeps every generation, ordering members beyond the root as
/// males, females, then unknown. `Paternal`/`Maternal` walk a single chain
/// from the root and stop where the expected parent is missing from the
/// next level; each kept animal becomes its own level.
pub fn filter_lineage(levels: &[Level], mode: LineageMode) -> Vec<Level> {
    match mode {
        LineageMode::Both => levels
            .iter()
            .enumerate()
            .map(|(depth, level)| {
                let mut level = level.clone();
                if depth > 0 {
                    level.sort_by_key(|animal| animal.sex().display_rank());
                }
                level
            })
            .collect(),
        LineageMode::Paternal => single_line(levels, |animal| animal.father_id()),
        LineageMode::Maternal => single_line(levels, |animal| animal.mother_id()),
    }
}

fn single_line<F>(levels: &[Level], parent_of: F) -> Vec<Level>
where
    F: Fn(&AnimalRecord) -> Option<AnimalId>,
{
    let Some(root) = levels.first().and_then(|level| level.first()) else {
        return Vec::new();
    };

    let mut chain = vec![root.clone()];
    for next_level in &levels[1..] {
        let Some(tail) = chain.last() else {
            break;
        };
        let Some(parent_id) = parent_of(tail) else {
            break;
        };
        match next_level.iter().find(|candidate| candidate.id() == parent_id) {
            Some(parent) => chain.push(parent.clone()),
            None => break,
        }
    }

    chain.into_iter().map(|animal| vec![animal]).collect()
}

/// Role an ancestor plays toward the generation below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRole {
    Father,
    Mother,
    /// Father of one child and mother of another. Only happens with bad data.
    FatherAndMother,
}

impl ParentRole {
    pub fn label(&self) -> &'static str {
        match self {
            ParentRole::Father => "Padre",
            ParentRole::Mother => "Madre",
            ParentRole::FatherAndMother => "Padre / Madre",
        }
    }
}

impl fmt::Display for ParentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Labels `ancestor` by scanning the children in `previous_level`.
pub fn parent_role(ancestor: &AnimalRecord, previous_level: &[AnimalRecord]) -> Option<ParentRole> {
    let id = ancestor.id();
    let is_father = previous_level.iter().any(|child| child.parents().is_father(id));
    let is_mother = previous_level.iter().any(|child| child.parents().is_mother(id));

    match (is_father, is_mother) {
        (true, true) => Some(ParentRole::FatherAndMother),
        (true, false) => Some(ParentRole::Father),
        (false, true) => Some(ParentRole::Mother),
        (false, false) => None,
    }
}

const ANCESTOR_LABELS: &[&str] = &[
    "Padres",
    "Abuelos",
    "Bisabuelos",
    "Tatarabuelos",
    "Trastatarabuelos",
];

const DESCENDANT_LABELS: &[&str] = &[
    "Hijos",
    "Nietos",
    "Bisnietos",
    "Tataranietos",
    "Trastataranietos",
];

/// Generation name for level `depth`.
pub fn level_label(direction: Direction, depth: usize) -> String {
    if depth == 0 {
        return "Animal".to_string();
    }
    let labels = match direction {
        Direction::Ancestors => ANCESTOR_LABELS,
        Direction::Descendants => DESCENDANT_LABELS,
    };
    labels
        .get(depth - 1)
        .map(|label| label.to_string())
        .unwrap_or_else(|| format!("Generación {}", depth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animal::Sex;

    fn scenario_levels() -> Vec<Level> {
        vec![
            vec![AnimalRecord::new(5).with_father(2).with_mother(3)],
            vec![
                AnimalRecord::new(3).with_sex(Sex::Hembra),
                AnimalRecord::new(2).with_sex(Sex::Macho),
            ],
        ]
    }

    fn ids(levels: &[Level]) -> Vec<Vec<u64>> {
        levels
            .iter()
            .map(|level| level.iter().map(|a| a.id()).collect())
            .collect()
    }

    #[test]
    fn test_both_orders_siblings() {
        let mut levels = scenario_levels();
        levels[1].push(AnimalRecord::new(4));
        levels[1].insert(0, AnimalRecord::new(6).with_sex(Sex::Macho));

        let filtered = filter_lineage(&levels, LineageMode::Both);
        assert_eq!(ids(&filtered), vec![vec![5], vec![6, 2, 3, 4]]);
    }

    #[test]
    fn test_paternal_and_maternal() {
        let levels = scenario_levels();
        assert_eq!(ids(&filter_lineage(&levels, LineageMode::Paternal)), vec![vec![5], vec![2]]);
        assert_eq!(ids(&filter_lineage(&levels, LineageMode::Maternal)), vec![vec![5], vec![3]]);
    }

    #[test]
    fn test_chain_truncates() {
        let levels = vec![
            vec![AnimalRecord::new(5).with_father(2)],
            vec![AnimalRecord::new(2).with_father(10)],
            vec![AnimalRecord::new(11)],
            vec![AnimalRecord::new(12)],
        ];
        let chain = filter_lineage(&levels, LineageMode::Paternal);
        assert_eq!(ids(&chain), vec![vec![5], vec![2]]);

        let maternal = filter_lineage(&levels, LineageMode::Maternal);
        assert_eq!(ids(&maternal), vec![vec![5]]);

        assert!(filter_lineage(&[], LineageMode::Paternal).is_empty());
    }

    #[test]
    fn test_parent_role() {
        let children = vec![
            AnimalRecord::new(1).with_father(7).with_mother(8),
            AnimalRecord::new(2).with_mother(7),
        ];
        assert_eq!(parent_role(&AnimalRecord::new(8), &children), Some(ParentRole::Mother));
        assert_eq!(
            parent_role(&AnimalRecord::new(7), &children),
            Some(ParentRole::FatherAndMother)
        );
        assert_eq!(parent_role(&AnimalRecord::new(9), &children), None);
        assert_eq!(ParentRole::FatherAndMother.label(), "Padre / Madre");
    }

    #[test]
    fn test_level_labels() {
        assert_eq!(level_label(Direction::Ancestors, 0), "Animal");
        assert_eq!(level_label(Direction::Ancestors, 1), "Padres");
        assert_eq!(level_label(Direction::Ancestors, 3), "Bisabuelos");
        assert_eq!(level_label(Direction::Descendants, 2), "Nietos");
        assert_eq!(level_label(Direction::Descendants, 7), "Generación 7");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("paterna".parse::<LineageMode>(), Ok(LineageMode::Paternal));
        assert_eq!("Maternal".parse::<LineageMode>(), Ok(LineageMode::Maternal));
        assert!("x".parse::<LineageMode>().is_err());
    }
}
