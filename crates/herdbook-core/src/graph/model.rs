//! Flat tree graph as served by the backend.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::animal::{coerce_id, AnimalId, AnimalRecord};

/// Which way a tree grows from its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ancestors,
    Descendants,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ancestors => "ancestors",
            Direction::Descendants => "descendants",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ancestors" | "ancestros" | "up" => Ok(Direction::Ancestors),
            "descendants" | "descendientes" | "down" => Ok(Direction::Descendants),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// A relationship edge. Which endpoint is the parent is not guaranteed;
/// see [`super::orientation`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TreeEdge {
    pub from: AnimalId,
    pub to: AnimalId,
    pub relation: String,
}

impl TreeEdge {
    pub fn new(from: AnimalId, to: AnimalId, relation: impl Into<String>) -> Self {
        Self {
            from,
            to,
            relation: relation.into(),
        }
    }

    pub fn touches(&self, id: AnimalId) -> bool {
        self.from == id || self.to == id
    }
}

/// Cached totals sent alongside the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCounts {
    #[serde(default)]
    pub nodes: usize,
    #[serde(default)]
    pub edges: usize,
}

/// A genealogy graph centered on one animal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeGraph {
    #[serde(
        rename = "rootId",
        alias = "root_id",
        default,
        deserialize_with = "lenient_optional_id"
    )]
    pub root_id: Option<AnimalId>,

    #[serde(default, deserialize_with = "lenient_nodes")]
    pub nodes: BTreeMap<AnimalId, AnimalRecord>,

    #[serde(default, deserialize_with = "lenient_edges")]
    pub edges: Vec<TreeEdge>,

    /// Generations materialized by the server. `0` means unknown.
    #[serde(default)]
    pub depth: i64,

    #[serde(default)]
    pub counts: GraphCounts,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub generated_at: Option<DateTime<Utc>>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Direction>,
}

impl TreeGraph {
    /// Creates a graph holding only its root.
    pub fn new(root: AnimalRecord, kind: Direction) -> Self {
        let root_id = root.id();
        let mut nodes = BTreeMap::new();
        nodes.insert(root_id, root);
        let mut graph = Self {
            root_id: Some(root_id),
            nodes,
            edges: Vec::new(),
            depth: 0,
            counts: GraphCounts::default(),
            generated_at: None,
            kind: Some(kind),
        };
        graph.recount();
        graph
    }

    pub fn with_node(mut self, record: AnimalRecord) -> Self {
        self.nodes.insert(record.id(), record);
        self.recount();
        self
    }

    pub fn with_edge(mut self, from: AnimalId, to: AnimalId, relation: impl Into<String>) -> Self {
        self.edges.push(TreeEdge::new(from, to, relation));
        self.recount();
        self
    }

    pub fn with_depth(mut self, depth: i64) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    /// The root record, if the graph has one.
    pub fn root(&self) -> Option<&AnimalRecord> {
        self.root_id.and_then(|id| self.nodes.get(&id))
    }

    pub fn node(&self, id: AnimalId) -> Option<&AnimalRecord> {
        self.nodes.get(&id)
    }

    /// Recomputes `counts` from the node and edge collections.
    pub fn recount(&mut self) {
        self.counts = GraphCounts {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
        };
    }

    /// Whether the cached totals agree with the actual collections.
    pub fn counts_match(&self) -> bool {
        self.counts.nodes == self.nodes.len() && self.counts.edges == self.edges.len()
    }

    /// True when a root is declared but missing from `nodes`.
    pub fn is_missing_root(&self) -> bool {
        matches!(self.root_id, Some(id) if !self.nodes.contains_key(&id))
    }

    /// Whether `self` was generated strictly after `other`.
    pub fn is_newer_than(&self, other: &TreeGraph) -> bool {
        match (self.generated_at, other.generated_at) {
            (Some(mine), Some(theirs)) => mine > theirs,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

fn lenient_optional_id<'de, D>(deserializer: D) -> Result<Option<AnimalId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(coerce_id))
}

/// Node map keyed by id. Entries that cannot be normalized are dropped,
/// as are nodes whose own `id` disagrees with their key. A node object
/// without an `id` takes it from its key.
fn lenient_nodes<'de, D>(deserializer: D) -> Result<BTreeMap<AnimalId, AnimalRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut nodes = BTreeMap::new();

    for (key, value) in raw {
        let Some(id) = coerce_id(&Value::String(key.clone())) else {
            warn!("Skipping graph node with invalid key {:?}", key);
            continue;
        };
        let Value::Object(mut attributes) = value else {
            warn!("Skipping graph node {} that is not an object", id);
            continue;
        };
        match attributes.get("id").and_then(coerce_id) {
            Some(own) if own != id => {
                warn!("Skipping graph node under key {} that reports id {}", id, own);
                continue;
            }
            Some(_) => {}
            None => {
                attributes.insert("id".to_string(), Value::from(id));
            }
        }
        match AnimalRecord::from_attributes(attributes) {
            Ok(record) => {
                nodes.insert(id, record);
            }
            Err(e) => warn!("Skipping graph node {}: {}", id, e),
        }
    }

    Ok(nodes)
}

#[derive(Deserialize)]
struct RawEdge {
    #[serde(default)]
    from: Value,
    #[serde(default)]
    to: Value,
    #[serde(default)]
    relation: Option<String>,
}

/// Edge list. Edges whose endpoints are not valid ids are dropped.
fn lenient_edges<'de, D>(deserializer: D) -> Result<Vec<TreeEdge>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<RawEdge>>::deserialize(deserializer)?.unwrap_or_default();
    let total = raw.len();

    let edges: Vec<TreeEdge> = raw
        .into_iter()
        .filter_map(|edge| {
            Some(TreeEdge {
                from: coerce_id(&edge.from)?,
                to: coerce_id(&edge.to)?,
                relation: edge.relation.unwrap_or_default(),
            })
        })
        .collect();

    if edges.len() < total {
        warn!("Dropped {} edges with invalid endpoints", total - edges.len());
    }

    Ok(edges)
}

/// RFC 3339 strings or epoch milliseconds.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_wire_shape() {
        let graph: TreeGraph = serde_json::from_value(json!({
            "rootId": 5,
            "nodes": {
                "5": { "id": 5, "record": "R5" },
                "2": { "record": "R2", "sex": "Macho" },
                "x": { "id": 1 }
            },
            "edges": [
                { "from": 2, "to": 5, "relation": "father" },
                { "from": "3", "to": 5, "relation": "mother" },
                { "from": 0, "to": 5, "relation": "father" }
            ],
            "depth": 1,
            "counts": { "nodes": 2, "edges": 2 },
            "generated_at": "2024-05-01T10:00:00Z",
            "type": "ancestors"
        }))
        .unwrap();

        assert_eq!(graph.root_id, Some(5));
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.node(2).and_then(|n| n.code()), Some("R2"));
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[1], TreeEdge::new(3, 5, "mother"));
        assert_eq!(graph.kind, Some(Direction::Ancestors));
        assert!(graph.generated_at.is_some());
        assert!(graph.counts_match());
    }

    #[test]
    fn test_node_with_conflicting_id_skipped() {
        let graph: TreeGraph = serde_json::from_value(json!({
            "rootId": 5,
            "nodes": {
                "5": { "id": 5 },
                "2": { "id": 8, "sex": "Macho" },
                "3": { "id": "3" }
            }
        }))
        .unwrap();

        assert_eq!(graph.nodes.keys().copied().collect::<Vec<_>>(), vec![3, 5]);
        assert!(graph.node(8).is_none());
        for (key, node) in &graph.nodes {
            assert_eq!(*key, node.id());
        }
    }

    #[test]
    fn test_minimal_graph() {
        let graph: TreeGraph = serde_json::from_value(json!({ "root_id": "7" })).unwrap();
        assert_eq!(graph.root_id, Some(7));
        assert!(graph.is_missing_root());
        assert!(graph.edges.is_empty());
        assert_eq!(graph.depth, 0);
    }

    #[test]
    fn test_epoch_millis_timestamp() {
        let graph: TreeGraph =
            serde_json::from_value(json!({ "generated_at": 1_700_000_000_000i64 })).unwrap();
        assert_eq!(graph.generated_at.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn test_is_newer_than() {
        let older = TreeGraph::new(AnimalRecord::new(1), Direction::Ancestors)
            .with_generated_at(Utc.timestamp_opt(100, 0).unwrap());
        let newer = older.clone().with_generated_at(Utc.timestamp_opt(200, 0).unwrap());
        let undated = TreeGraph::new(AnimalRecord::new(1), Direction::Ancestors);

        assert!(newer.is_newer_than(&older));
        assert!(!older.is_newer_than(&newer));
        assert!(!older.is_newer_than(&older));
        assert!(older.is_newer_than(&undated));
        assert!(!undated.is_newer_than(&older));
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("Ancestors".parse::<Direction>(), Ok(Direction::Ancestors));
        assert_eq!("descendientes".parse::<Direction>(), Ok(Direction::Descendants));
        assert!("sideways".parse::<Direction>().is_err());
    }
}
