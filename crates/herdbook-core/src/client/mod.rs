mod error;
mod http;

pub use error::ClientError;
pub use http::HttpTreeClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::animal::{AnimalId, AnimalRecord};
use crate::graph::{Direction, TreeGraph};

/// Parameters of a tree request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeRequest {
    pub animal_id: AnimalId,
    pub max_depth: usize,
    /// Comma-separated node fields to populate server-side.
    pub fields: String,
}

impl TreeRequest {
    pub fn new(animal_id: AnimalId, max_depth: usize, fields: impl Into<String>) -> Self {
        Self {
            animal_id,
            max_depth,
            fields: fields.into(),
        }
    }
}

/// Whether an animal has any recorded relatives. Advisory only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalDependencies {
    #[serde(default)]
    pub has_parents: bool,
    #[serde(default)]
    pub has_children: bool,
}

impl AnimalDependencies {
    /// Whether relatives are expected in `direction`.
    pub fn expects(&self, direction: Direction) -> bool {
        match direction {
            Direction::Ancestors => self.has_parents,
            Direction::Descendants => self.has_children,
        }
    }
}

/// One page of a paginated list call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page<T> {
    #[serde(alias = "data", alias = "results")]
    pub items: Vec<T>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page", alias = "pages", alias = "totalPages")]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.page >= self.total_pages || self.items.is_empty()
    }
}

/// Trait for the backend that serves animals and their trees.
///
/// This abstraction lets the genealogy service run against the REST API
/// or any in-process source without changing the rest of the code.
#[async_trait]
pub trait TreeSource: Send + Sync {
    /// Fetches the ancestors graph for `request.animal_id`.
    async fn get_ancestor_tree(&self, request: &TreeRequest) -> Result<TreeGraph, ClientError>;

    /// Fetches the descendants graph for `request.animal_id`.
    async fn get_descendant_tree(&self, request: &TreeRequest) -> Result<TreeGraph, ClientError>;

    /// Asks whether the animal has any recorded parents or children.
    async fn get_animal_dependencies(&self, animal_id: AnimalId) -> Result<AnimalDependencies, ClientError>;

    /// Fetches one animal.
    async fn get_by_id(&self, animal_id: AnimalId) -> Result<AnimalRecord, ClientError>;

    /// Fetches one page of the herd.
    async fn list_animals(&self, page: u32, per_page: u32) -> Result<Page<AnimalRecord>, ClientError>;

    /// Fetches the graph for `direction`.
    async fn get_tree(&self, direction: Direction, request: &TreeRequest) -> Result<TreeGraph, ClientError> {
        match direction {
            Direction::Ancestors => self.get_ancestor_tree(request).await,
            Direction::Descendants => self.get_descendant_tree(request).await,
        }
    }
}
